// Copyright (C) 2017-2018 Red Hat, Inc.
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! # `arraymgmt`
//!
//! `arraymgmt` drives enterprise block storage arrays through their HTTPS
//! management API for automation tools running idempotent "ensure desired
//! state" tasks:
//!
//!  * Log in once per array and share the session between every request of
//!    the run, renewing it when the array rejects it.
//!
//!  * Retry requests while the array replies HTTP 503, with a fixed backoff
//!    and a bounded retry budget.
//!
//!  * Discard every session on the array when the run ends.
//!
//!  * Compute the additions and removals needed to converge a membership
//!    (host groups per port, LUN paths, host WWNs) toward the desired state
//!    and apply them, reporting whether anything changed.
//!
//! To use `arraymgmt`, you need:
//!
//!  * Create one [`SessionManager`][1] for the run.
//!
//!  * Make a connection to each array via [`Client`][2].
//!
//!  * Either invoke [`Client::request()`][3] directly or converge a resource
//!    with [`converge_membership()`][4] or [`converge_set()`][5].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::{BTreeMap, BTreeSet};
//!
//! use arraymgmt::{
//!     converge_membership, Client, ClientConfig, DesiredState,
//!     EndpointIdentity, HostGroups, SessionManager,
//! };
//! use secrecy::SecretString;
//!
//! fn main() -> arraymgmt::Result<()> {
//!     let manager = SessionManager::new(ClientConfig::from_env()?)?;
//!     let endpoint = EndpointIdentity::new(
//!         "192.0.2.10",
//!         "maintenance",
//!         SecretString::from("secret"),
//!     )?;
//!     let client = Client::new(&manager, endpoint);
//!
//!     let mut desired = BTreeMap::new();
//!     desired.insert(
//!         "CL1-A".to_string(),
//!         ["esx01", "esx02"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
//!     );
//!     let mut host_groups = HostGroups::for_membership(&client, &desired)?;
//!     let ret = converge_membership(&mut host_groups, &desired, DesiredState::Present)?;
//!     println!("changed: {}", ret.changed);
//!     Ok(())
//! }
//! ```
//!
//! [1]: struct.SessionManager.html
//! [2]: struct.Client.html
//! [3]: struct.Client.html#method.request
//! [4]: fn.converge_membership.html
//! [5]: fn.converge_set.html

pub use self::client::{Client, Job};
pub use self::config::{ClientConfig, RetryPolicy};
pub use self::error::{ArrayError, Result};
pub use self::misc::{mask_token, normalize_wwn, verify_port_id};
pub use self::reconcile::{
    reconcile_membership, reconcile_set, Membership, MembershipDelta, SetDelta,
};
pub use self::resources::{HostGroupRef, HostGroups, HostWwns, LunPaths};
pub use self::session::{
    EndpointIdentity, Session, SessionManager, SessionStore, Sleeper, ThreadSleeper,
};
pub use self::sync::{
    converge_membership, converge_set, ChangeResult, DesiredState, MembershipResource,
    SetResource,
};
pub use self::transport::{Auth, Body, HttpTransport, Method, Request, Response, Transport};

mod client;
mod config;
mod error;
mod misc;
mod reconcile;
mod resources;
mod session;
mod sync;
mod transport;
