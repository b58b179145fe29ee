use crate::{Allocator, HeapNode};
use bigdecimal::BigDecimal;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNumber {
    Arbitrary(BigDecimal),
    Float(f64),
    NegInt(i64),
    PosInt(u64),
}
use ParsedNumber::*;

impl ParsedNumber {
    pub fn checked_add(self, other: Self) -> Option<Self> {
        fn f64_checked_add(a: f64, b: f64) -> Option<ParsedNumber> {
            Some(a + b).filter(|f| f.is_finite()).map(Float)
        }

        match (self, other) {
            (PosInt(lhs), PosInt(rhs)) => lhs.checked_add(rhs).map(PosInt),
            (NegInt(lhs), NegInt(rhs)) => lhs.checked_add(rhs).map(NegInt),
            (PosInt(pos), NegInt(neg)) | (NegInt(neg), PosInt(pos)) => {
                let neg = neg.checked_neg()? as u64;

                if pos >= neg {
                    Some(PosInt(pos - neg))
                } else {
                    Some(NegInt(-((neg - pos) as i64)))
                }
            }
            (Float(lhs), Float(rhs)) => f64_checked_add(lhs, rhs),

            // Promotion into f64. We accept loss of precision in these cases.
            (PosInt(lhs), Float(rhs)) => f64_checked_add(lhs as f64, rhs),
            (NegInt(lhs), Float(rhs)) => f64_checked_add(lhs as f64, rhs),
            (Float(lhs), PosInt(rhs)) => f64_checked_add(lhs, rhs as f64),
            (Float(lhs), NegInt(rhs)) => f64_checked_add(lhs, rhs as f64),

            // Promotion into arbitrary precision.
            (Arbitrary(a), b) | (b, Arbitrary(a)) => match b {
                Arbitrary(n) => Some(n),
                Float(n) => n.try_into().ok(),
                NegInt(n) => Some(n.into()),
                PosInt(n) => Some(n.into()),
            }
            .map(|b| Arbitrary(a + b)),
        }
    }

    pub fn into_heap_node<'alloc>(self, alloc: &'alloc Allocator) -> HeapNode<'alloc> {
        match self {
            PosInt(n) => HeapNode::PosInt(n),
            NegInt(n) => HeapNode::NegInt(n),
            Float(n) => HeapNode::Float(n),
            Arbitrary(n) => {
                HeapNode::String(crate::BumpStr::from_str(&n.normalized().to_string(), alloc))
            }
        }
    }
}
