use crate::instance::ServiceInstance;
use std::collections::HashSet;

/// Keep the first instance for every name, preserving input order.
///
/// Frontends are emitted once per service even though discovery reports one
/// instance per task. Order matters downstream (rule priority and
/// first-match), so this is a stable single pass.
pub fn dedupe_by_name<'a, I>(instances: I) -> Vec<&'a ServiceInstance>
where
    I: IntoIterator<Item = &'a ServiceInstance>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::new();
    for instance in instances {
        if seen.insert(instance.name.as_str()) {
            kept.push(instance);
        }
    }
    kept
}
