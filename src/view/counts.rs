//! Small counter bundle shared by prefixes, peers, and the view itself.

use super::state::StateMask;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyCounts {
    pub active: u32,
    pub inactive: u32,
}

impl FamilyCounts {
    pub fn masked(&self, mask: StateMask) -> u32 {
        let mut total = 0;
        if mask.contains(StateMask::ACTIVE) {
            total += self.active;
        }
        if mask.contains(StateMask::INACTIVE) {
            total += self.inactive;
        }
        total
    }
}
