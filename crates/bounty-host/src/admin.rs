use bounty_types::{AccountId, AdminAuthority};
use std::collections::HashSet;

/// Fixed set of identities holding the admin role
#[derive(Clone, Debug, Default)]
pub struct AdminRoster {
    admins: HashSet<AccountId>,
}

impl AdminRoster {
    pub fn new(admins: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn with_admin(mut self, admin: AccountId) -> Self {
        self.admins.insert(admin);
        self
    }
}

impl AdminAuthority for AdminRoster {
    fn is_admin(&self, who: &AccountId) -> bool {
        self.admins.contains(who)
    }
}
