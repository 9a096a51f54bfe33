//! External audio manager collaborator.

use tracing::debug;

use crate::error::AudioManagerError;
use crate::types::{ManagerId, Node};

/// Mirror of the node set kept by an external audio manager daemon.
///
/// Called at most once per node creation and retirement. Failures are
/// logged by the caller and never escalated.
pub trait AudioManager {
    fn register(&mut self, node: &Node) -> Result<ManagerId, AudioManagerError>;
    fn unregister(&mut self, node: &Node) -> Result<(), AudioManagerError>;
}

/// Hands out sequential ids while its domain is up.
#[derive(Debug)]
pub struct LocalAudioManager {
    next_id: u16,
    domain_up: bool,
}

impl LocalAudioManager {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            domain_up: true,
        }
    }

    pub fn set_domain_up(&mut self, up: bool) {
        self.domain_up = up;
    }
}

impl Default for LocalAudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager for LocalAudioManager {
    fn register(&mut self, node: &Node) -> Result<ManagerId, AudioManagerError> {
        if !self.domain_up {
            return Err(AudioManagerError::Unavailable);
        }
        let id = ManagerId(self.next_id);
        self.next_id = self.next_id.checked_add(1).ok_or_else(|| AudioManagerError::Rejected {
            key: node.key().to_string(),
            reason: "id space exhausted".to_string(),
        })?;
        debug!("registered '{}' as {}", node.key(), id);
        Ok(id)
    }

    fn unregister(&mut self, node: &Node) -> Result<(), AudioManagerError> {
        if !self.domain_up {
            return Err(AudioManagerError::Unavailable);
        }
        debug!("unregistered '{}'", node.key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Implement};

    #[test]
    fn test_sequential_ids() {
        let mut am = LocalAudioManager::new();
        let node = Node::new("a", Direction::Output, Implement::Device);
        assert_eq!(am.register(&node).unwrap(), ManagerId(1));
        assert_eq!(am.register(&node).unwrap(), ManagerId(2));
    }

    #[test]
    fn test_domain_down_rejects() {
        let mut am = LocalAudioManager::new();
        am.set_domain_up(false);
        let node = Node::new("a", Direction::Output, Implement::Device);
        assert_eq!(am.register(&node), Err(AudioManagerError::Unavailable));
        assert_eq!(am.unregister(&node), Err(AudioManagerError::Unavailable));
    }
}
