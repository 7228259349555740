//! Classifying a queried syntax node against a declaration's shape.

use strata_common::SyntaxId;

use crate::body::provider::DeclarationShape;
use crate::resolver::SyntaxTree;

/// Where a queried syntax node sits within its declaration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ElementContainer {
    /// In the declaration signature; no body analysis is needed.
    Signature,
    /// In signature parts that require full resolution capability: a
    /// default parameter value or a delegated constructor call.
    SignatureBody,
    /// Inside the body, under the top-level statement at this index.
    Body(usize),
    /// The body block node itself; requires the whole body.
    BodyBlock,
    /// Not locatable within the declaration — an internal inconsistency,
    /// answered with "no result" rather than a crash.
    Unknown,
}

/// Walks `node`'s ancestor chain and matches it against the declaration's
/// shape. The walk tracks the previous (one-level-lower) node so that a
/// statement index and the default-value-vs-parameter distinction can be
/// recovered at the point where the chain crosses the shape.
pub(crate) fn classify(
    tree: &dyn SyntaxTree,
    shape: &DeclarationShape,
    node: SyntaxId,
) -> ElementContainer {
    let mut previous: Option<SyntaxId> = None;
    let mut current = Some(node);

    while let Some(here) = current {
        if Some(here) == shape.body_block {
            match previous {
                // The body block itself was requested.
                None => return ElementContainer::BodyBlock,
                Some(statement) => {
                    match shape.statements.iter().position(|s| *s == statement) {
                        Some(index) => return ElementContainer::Body(index),
                        // The node hangs off the block but not under any
                        // known topmost statement.
                        None => break,
                    }
                }
            }
        }

        if let Some(parameter) = shape.parameters.iter().find(|p| p.node == here) {
            return if previous.is_some() && previous == parameter.default_value {
                ElementContainer::SignatureBody
            } else {
                ElementContainer::Signature
            };
        }

        if Some(here) == shape.delegated_call {
            return ElementContainer::SignatureBody;
        }

        if here == shape.declaration {
            return ElementContainer::Signature;
        }

        previous = Some(here);
        current = tree.parent(here);
    }

    ElementContainer::Unknown
}
