use serde::{Deserialize, Serialize};

/// Row-level visibility attribute embedded in every protected model.
///
/// Protected rows are visible to privileged callers only. The descriptor is
/// required on every row so that reads and the security filter agree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityDescriptor {
    pub protected: bool,
}

impl SecurityDescriptor {
    pub fn protected() -> Self {
        Self { protected: true }
    }

    pub fn public() -> Self {
        Self { protected: false }
    }
}
