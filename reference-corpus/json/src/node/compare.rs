use super::{AsNode, Field, Fields, Node};
use crate::number::Ops;
use itertools::{EitherOrBoth, Itertools};
use std::cmp::Ordering;

/// compare evaluates the deep ordering of `lhs` and `rhs`.
/// This function establishes an arbitrary, total ordering over
/// which is stable across AsNode implementations. Arrays and
/// objects are compared lexicographically by walking their ordered
/// items or lexicographic properties.
pub fn compare<L: AsNode, R: AsNode>(lhs: &L, rhs: &R) -> Ordering {
    compare_node(&lhs.as_node(), &rhs.as_node())
}

/// compare_node evaluates the deep ordering of `lhs` and `rhs`,
/// which have already been unwrapped into Node instances.
/// Generally you should use compare() instead, which allows the compiler
/// to collapse an internal match statement of as_node() with the match
/// statement within compare_node().
#[inline]
pub fn compare_node<'l, 'r, L: AsNode, R: AsNode>(
    lhs: &Node<'l, L>,
    rhs: &Node<'r, R>,
) -> Ordering {
    match (lhs, rhs) {
        (Node::Array(lhs), Node::Array(rhs)) => lhs
            .iter()
            .zip_longest(rhs.iter())
            .map(|eob| match eob {
                EitherOrBoth::Both(lhs, rhs) => compare(lhs, rhs),
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        (Node::Bool(lhs), Node::Bool(rhs)) => lhs.cmp(&rhs),
        (Node::Bytes(lhs), Node::Bytes(rhs)) => lhs.cmp(rhs),
        (Node::Null, Node::Null) => Ordering::Equal,
        (Node::Object(lhs), Node::Object(rhs)) => lhs
            .iter()
            .zip_longest(rhs.iter())
            .map(|eob| match eob {
                EitherOrBoth::Both(lhs, rhs) => {
                    let prop_ord = lhs.property().cmp(rhs.property());
                    match prop_ord {
                        Ordering::Equal => compare(lhs.value(), rhs.value()),
                        _ => prop_ord,
                    }
                }
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        (Node::String(lhs), Node::String(rhs)) => lhs.cmp(rhs),

        // Numeric comparisons using number::Ops trait.
        (Node::NegInt(lhs), Node::NegInt(rhs)) => lhs.json_cmp(*rhs),
        (Node::PosInt(lhs), Node::PosInt(rhs)) => lhs.json_cmp(*rhs),
        (Node::Float(lhs), Node::Float(rhs)) => lhs.json_cmp(*rhs),
        (Node::NegInt(lhs), Node::PosInt(rhs)) => lhs.json_cmp(*rhs),
        (Node::PosInt(lhs), Node::NegInt(rhs)) => lhs.json_cmp(*rhs),

        // Cross-type numeric comparisons using number::Ops trait.
        (Node::PosInt(lhs), Node::Float(rhs)) => lhs.json_cmp(*rhs),
        (Node::Float(lhs), Node::PosInt(rhs)) => lhs.json_cmp(*rhs),
        (Node::NegInt(lhs), Node::Float(rhs)) => lhs.json_cmp(*rhs),
        (Node::Float(lhs), Node::NegInt(rhs)) => lhs.json_cmp(*rhs),

        // Types are not comparable. Define an (arbitrary) total ordering.
        (Node::Null, _) => Ordering::Less,
        (_, Node::Null) => Ordering::Greater,
        (Node::Bool(_), _) => Ordering::Less,
        (_, Node::Bool(_)) => Ordering::Greater,
        (Node::Bytes(_), _) => Ordering::Less,
        (_, Node::Bytes(_)) => Ordering::Greater,
        (Node::Float(_), _) => Ordering::Less,
        (_, Node::Float(_)) => Ordering::Greater,
        (Node::NegInt(_), _) => Ordering::Less,
        (_, Node::NegInt(_)) => Ordering::Greater,
        (Node::PosInt(_), _) => Ordering::Less,
        (_, Node::PosInt(_)) => Ordering::Greater,
        (Node::String(_), _) => Ordering::Less,
        (_, Node::String(_)) => Ordering::Greater,
        (Node::Array(_), _) => Ordering::Less,
        (_, Node::Array(_)) => Ordering::Greater,
    }
}
