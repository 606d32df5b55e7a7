//! Namespace annotation keys carrying pre-allocated security ranges

/// UID block allocated to the namespace, `start/size`
pub const UID_RANGE_ANNOTATION: &str = "openshift.io/sa.scc.uid-range";

/// MCS label allocated to the namespace, e.g. `s0:c1,c0`
pub const MCS_ANNOTATION: &str = "openshift.io/sa.scc.mcs";

/// Supplemental group blocks, comma separated; first block wins
pub const SUPPLEMENTAL_GROUPS_ANNOTATION: &str = "openshift.io/sa.scc.supplemental-groups";
