//! Instance numbering for windows that share a title and executable.
//!
//! Three Notepad windows all titled "Untitled" get instance numbers 0, 1 and 2.
//! Numbers are dense within each `(title, exeName)` group and stick to a
//! window across cycles as long as its identity does not change.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::engine::types::{LiveWindowSet, RawWindowSet, WindowHandle, WindowIdentity, WindowInfo};

type Group = SmallVec<[WindowHandle; 4]>;

/// Assigns instance numbers to `raw`, reusing numbers from `previous`.
///
/// A window keeps its previous number when its identity is unchanged and the
/// number still fits inside the group; any other window takes the lowest free
/// number. Groups are processed independently, so the result is dense per
/// identity.
#[must_use]
pub fn assign_instances(raw: &RawWindowSet, previous: &LiveWindowSet) -> LiveWindowSet {
    let mut groups: BTreeMap<&WindowIdentity, Group> = BTreeMap::new();
    for (handle, identity) in raw {
        groups.entry(identity).or_default().push(*handle);
    }

    let mut live = LiveWindowSet::new();

    for (identity, handles) in groups {
        let size = u32::try_from(handles.len()).unwrap_or(u32::MAX);
        let mut reserved: SmallVec<[bool; 8]> = SmallVec::from_elem(false, handles.len());
        let mut fresh: Group = SmallVec::new();

        for handle in handles {
            let kept = previous
                .get(&handle)
                .filter(|info| info.has_identity(identity))
                .map(|info| info.instance_number)
                .filter(|number| *number < size)
                .filter(|number| !reserved[*number as usize]);

            match kept {
                Some(number) => {
                    reserved[number as usize] = true;
                    live.insert(handle, window_info(identity, number));
                }
                None => fresh.push(handle),
            }
        }

        let mut free = (0..size).filter(|number| !reserved[*number as usize]);
        for handle in fresh {
            let number = free.next().unwrap_or(size);
            live.insert(handle, window_info(identity, number));
        }
    }

    live
}

fn window_info(identity: &WindowIdentity, instance_number: u32) -> WindowInfo {
    WindowInfo {
        title: identity.title.clone(),
        exe_name: identity.exe_name.clone(),
        instance_number,
    }
}
