use tokio::sync::mpsc::UnboundedSender;

use super::lsa::LsaKey;
use super::lsdb::Scope;
use super::neigh::NeighborId;

/// Notifications to route computation and to the adjacency layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    LsdbChanged(Scope, LsaKey),
    RequestListEmpty(NeighborId),
    BadLsRequest(NeighborId),
}

pub trait Observer: Send {
    fn lsdb_changed(&self, _scope: Scope, _key: LsaKey) {}

    /// Loading is complete, the adjacency may move to Full.
    fn request_list_empty(&self, _nbr: NeighborId) {}

    fn bad_ls_request(&self, _nbr: NeighborId) {}
}

impl Observer for () {}

impl Observer for UnboundedSender<Notification> {
    fn lsdb_changed(&self, scope: Scope, key: LsaKey) {
        let _ = self.send(Notification::LsdbChanged(scope, key));
    }

    fn request_list_empty(&self, nbr: NeighborId) {
        let _ = self.send(Notification::RequestListEmpty(nbr));
    }

    fn bad_ls_request(&self, nbr: NeighborId) {
        let _ = self.send(Notification::BadLsRequest(nbr));
    }
}
