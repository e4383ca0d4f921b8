//! RPL storing-mode topology: DODAGs, ranks, parents, children, the
//! downward route tree and the timers that re-announce them.

pub(crate) mod consts;
mod dag;
mod parents;
mod process;
mod rank;
mod relations;
mod timer;
mod tree;
mod trickle;

pub use self::dag::{build_dis, Dag, DagError};
pub use self::parents::{ParentSlot, Peer};
pub use self::rank::Rank;
pub use self::relations::{Child, Children};
pub use self::timer::{DioTimer, OneShotTimer, PeriodicTimer};
pub use self::tree::{NodeId, RouteTree};
pub use self::trickle::TrickleTimer;
