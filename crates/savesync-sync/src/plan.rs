//! Reconciliation planning
//!
//! Turns one snapshot of both replicas into a list of actions. Planning is
//! pure: it performs no I/O and the same snapshot always yields the same
//! plan.
//!
//! ## Decision table
//!
//! `remote ahead` means `local_playtime < remote_playtime`; ties count as
//! local ahead.
//!
//! | Local | Remote | Digests | Remote ahead | Local ahead       |
//! |-------|--------|---------|--------------|-------------------|
//! | yes   | yes    | equal   | nothing      | nothing           |
//! | yes   | yes    | differ  | download     | upload (in place) |
//! | yes   | no     |         | delete local | upload (create)   |
//! | no    | yes    |         | download     | delete remote     |

use std::collections::BTreeMap;

use savesync_core::domain::{
    newtypes::{Playtime, RemoteId},
    record::{LocalFile, RemoteFileMetadata},
};
use tracing::warn;

// ============================================================================
// Pairing
// ============================================================================

/// Both replicas' view of one file name
///
/// At least one side is always present.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub name: String,
    pub local: Option<LocalFile>,
    pub remote: Option<RemoteFileMetadata>,
}

/// Pairs local and remote entries by exact name, ordered by name
///
/// If the remote replica lists the same name twice, the first entry is
/// kept and the rest are ignored for this pass.
pub fn pair(local: Vec<LocalFile>, remote: Vec<RemoteFileMetadata>) -> BTreeMap<String, Pairing> {
    let mut pairings: BTreeMap<String, Pairing> = BTreeMap::new();

    for file in local {
        let name = file.name().to_string();
        pairings.insert(
            name.clone(),
            Pairing {
                name,
                local: Some(file),
                remote: None,
            },
        );
    }

    for meta in remote {
        let entry = pairings.entry(meta.name.clone()).or_insert_with(|| Pairing {
            name: meta.name.clone(),
            local: None,
            remote: None,
        });
        if let Some(kept) = &entry.remote {
            warn!(name = %meta.name, kept = %kept.id, ignored = %meta.id, "Duplicate remote name");
            continue;
        }
        entry.remote = Some(meta);
    }

    pairings
}

/// Highest playtime annotation on the remote replica, zero when it is empty
pub fn remote_playtime(remote: &[RemoteFileMetadata]) -> Playtime {
    remote
        .iter()
        .map(RemoteFileMetadata::playtime)
        .fold(Playtime::ZERO, Playtime::max)
}

// ============================================================================
// Actions
// ============================================================================

/// A single mutation of one replica
#[derive(Debug, Clone)]
pub enum Action {
    /// Send local contents to the remote replica, in place when `existing` is set
    Upload {
        file: LocalFile,
        existing: Option<RemoteId>,
    },
    /// Replace or create the local record with the remote contents
    Download { remote: RemoteFileMetadata },
    /// Remove a stale local record
    DeleteLocal { name: String },
    /// Remove a stale remote object
    DeleteRemote { id: RemoteId, name: String },
}

impl Action {
    /// Name of the file the action touches
    pub fn name(&self) -> &str {
        match self {
            Action::Upload { file, .. } => file.name(),
            Action::Download { remote } => &remote.name,
            Action::DeleteLocal { name } | Action::DeleteRemote { name, .. } => name,
        }
    }

    /// Short label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Upload { existing: None, .. } => "upload",
            Action::Upload { .. } => "update",
            Action::Download { .. } => "download",
            Action::DeleteLocal { .. } => "delete-local",
            Action::DeleteRemote { .. } => "delete-remote",
        }
    }
}

/// Decides what to do with one pairing, `None` if both sides already agree
pub fn decide(
    pairing: Pairing,
    local_playtime: Playtime,
    remote_playtime: Playtime,
) -> Option<Action> {
    let remote_ahead = local_playtime < remote_playtime;

    match (pairing.local, pairing.remote) {
        (Some(local), Some(remote)) if local.hash() == remote.sha256() => None,
        (Some(local), Some(remote)) => Some(if remote_ahead {
            Action::Download { remote }
        } else {
            Action::Upload {
                file: local,
                existing: Some(remote.id),
            }
        }),
        (Some(local), None) => Some(if remote_ahead {
            Action::DeleteLocal {
                name: pairing.name,
            }
        } else {
            Action::Upload {
                file: local,
                existing: None,
            }
        }),
        (None, Some(remote)) => Some(if remote_ahead {
            Action::Download { remote }
        } else {
            Action::DeleteRemote {
                id: remote.id,
                name: pairing.name,
            }
        }),
        (None, None) => None,
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Everything one pass will do, computed from a single snapshot
#[derive(Debug, Clone)]
pub struct Plan {
    /// Clock value sampled at the start of the pass
    pub local_playtime: Playtime,
    /// Highest playtime on the remote replica
    pub remote_playtime: Playtime,
    /// Actions in name order
    pub actions: Vec<Action>,
    /// Names present on both sides with equal digests
    pub unchanged: usize,
}

impl Plan {
    /// Builds the plan for one snapshot of both replicas
    pub fn build(
        local: Vec<LocalFile>,
        remote: Vec<RemoteFileMetadata>,
        local_playtime: Playtime,
    ) -> Self {
        let remote_playtime = remote_playtime(&remote);
        let mut actions = Vec::new();
        let mut unchanged = 0;

        for pairing in pair(local, remote).into_values() {
            match decide(pairing, local_playtime, remote_playtime) {
                Some(action) => actions.push(action),
                None => unchanged += 1,
            }
        }

        Self {
            local_playtime,
            remote_playtime,
            actions,
            unchanged,
        }
    }

    /// The value the clock must be moved forward to, if any
    pub fn rebase_target(&self) -> Option<Playtime> {
        (self.remote_playtime > self.local_playtime).then_some(self.remote_playtime)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
