#![macro_use]

macro_rules! impl_id_traits {
    ($idtype: ty) => {
        impl $idtype {
            /// Convenience function to convert to usize.
            pub fn as_usize(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $idtype {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl From<$idtype> for usize {
            fn from(value: $idtype) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $idtype {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// One arm per operator so each impl block names the right trait/method.
// `$combine` receives both operands plus the elementwise closure.
macro_rules! impl_skyline_op {
    ($lhs: ty, $rhs: ty, $out: ty, $combine: expr, $op: ident, $method: ident, $f: expr) => {
        impl std::ops::$op<$rhs> for $lhs {
            type Output = $out;

            fn $method(self, rhs: $rhs) -> Self::Output {
                ($combine)(self, rhs, $f)
            }
        }
    };
}

// Give a single-reactant reaction both event contracts: the multiplicity
// is the filtered active count, a stochastic firing draws one lineage
// uniformly, and a scheduled firing draws the requested number without
// replacement.
macro_rules! impl_single_reactant_event {
    ($reaction: ty) => {
        impl crate::events::Reaction for $reaction {
            fn reactant_combinations(&self, model: &crate::state::Model) -> usize {
                model.count_active_nodes(crate::events::SingleReactant::filter(self))
            }

            fn apply(
                &self,
                model: &mut crate::state::Model,
            ) -> Result<(), crate::TreesimError> {
                let node =
                    model.draw_active_node(crate::events::SingleReactant::filter(self))?;
                crate::events::SingleReactant::apply_to_node(self, model, node)
            }
        }

        impl crate::events::TimedReaction for $reaction {
            fn max_firings(&self, model: &crate::state::Model) -> usize {
                model.count_active_nodes(crate::events::SingleReactant::filter(self))
            }

            fn apply_firings(
                &self,
                model: &mut crate::state::Model,
                firings: usize,
            ) -> Result<(), crate::TreesimError> {
                let nodes = model
                    .draw_active_nodes(crate::events::SingleReactant::filter(self), firings)?;
                for node in nodes {
                    crate::events::SingleReactant::apply_to_node(self, model, node)?;
                }
                Ok(())
            }
        }
    };
}

/// Generate the `+`, `-`, `*`, `/` surface for a pair of skyline operand
/// types on top of a single merge routine.
macro_rules! impl_skyline_ops {
    ($lhs: ty, $rhs: ty, $out: ty, $combine: expr) => {
        impl_skyline_op!($lhs, $rhs, $out, $combine, Add, add, |x: f64, y: f64| x + y);
        impl_skyline_op!($lhs, $rhs, $out, $combine, Sub, sub, |x: f64, y: f64| x - y);
        impl_skyline_op!($lhs, $rhs, $out, $combine, Mul, mul, |x: f64, y: f64| x * y);
        impl_skyline_op!($lhs, $rhs, $out, $combine, Div, div, |x: f64, y: f64| x / y);
    };
}
