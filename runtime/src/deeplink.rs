//! Deep-link collaborator.
//!
//! URI parsing is application code. A handler turns a URI it understands
//! into the ordered values to broadcast; the navigator plays them as a
//! multi-value send so each receiver can pace the sequence.

use crate::message::Payload;
use crate::navigator::Navigator;
use navstack_core::{Destination, LogCategory, LogLevel, NodeId};

pub trait DeepLinkHandler {
    /// `None` when the URI is not for this handler.
    fn values(&self, uri: &str) -> Option<Vec<Payload>>;
}

impl<F> DeepLinkHandler for F
where
    F: Fn(&str) -> Option<Vec<Payload>>,
{
    fn values(&self, uri: &str) -> Option<Vec<Payload>> {
        self(uri)
    }
}

impl<D: Destination> Navigator<D> {
    /// Offer `uri` to each handler in turn and broadcast the first match.
    pub fn open_url(&mut self, node: NodeId, uri: &str, handlers: &[&dyn DeepLinkHandler]) -> bool {
        let Some(values) = handlers.iter().find_map(|h| h.values(uri)) else {
            self.tree.log(
                LogCategory::Navigation,
                LogLevel::Warning,
                Some(node),
                format!("no deep-link handler for {uri}"),
            );
            return false;
        };
        self.tree.log(
            LogCategory::Navigation,
            LogLevel::Info,
            Some(node),
            format!("deep link {uri} -> {} value(s)", values.len()),
        );
        self.send_all(node, values);
        true
    }
}
