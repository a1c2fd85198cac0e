// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Merging of adjacent geometry groups into draw runs.
//!
//! Decoders emit one group per feature batch; consecutive groups that share
//! a technique and cover contiguous index ranges become a single object.

use tessera_core::geometry::Group;

/// A merged range of consecutive groups, materialized as one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedRun {
    /// First index (or vertex) of the run.
    pub start: u32,
    /// Number of indices (or vertices) in the run.
    pub count: u32,
    /// Technique shared by every group of the run.
    pub technique_index: usize,
    /// Render-order offset of the first group.
    pub render_order_offset: Option<f64>,
    /// How many groups were absorbed.
    pub groups: usize,
}

/// Iterator yielding [`MergedRun`]s for one tile offset.
///
/// Every group that contributes to a run gets `offset` recorded in its
/// created-offset set, so walking the same groups again for the same offset
/// yields nothing.
pub struct GroupRuns<'a, F> {
    groups: &'a mut [Group],
    cursor: usize,
    offset: i32,
    accept: F,
}

/// Walks `groups` for tile `offset`. `accept` is asked once per candidate
/// run head with its technique index; rejected groups are left untouched.
pub fn merge_groups<F>(groups: &mut [Group], offset: i32, accept: F) -> GroupRuns<'_, F>
where
    F: FnMut(usize) -> bool,
{
    GroupRuns {
        groups,
        cursor: 0,
        offset,
        accept,
    }
}

impl<F> Iterator for GroupRuns<'_, F>
where
    F: FnMut(usize) -> bool,
{
    type Item = MergedRun;

    fn next(&mut self) -> Option<MergedRun> {
        while let Some(head) = self.groups.get_mut(self.cursor) {
            self.cursor += 1;
            if head.created_offsets.contains(&self.offset) || !(self.accept)(head.technique_index)
            {
                continue;
            }
            head.created_offsets.insert(self.offset);

            let mut run = MergedRun {
                start: head.start,
                count: head.count,
                technique_index: head.technique_index,
                render_order_offset: head.render_order_offset,
                groups: 1,
            };
            while let Some(next) = self.groups.get_mut(self.cursor) {
                // Ranges past u32::MAX end the run; the geometry check rejects them.
                let Some(end) = run.start.checked_add(run.count) else {
                    break;
                };
                let Some(count) = run.count.checked_add(next.count) else {
                    break;
                };
                if next.technique_index != run.technique_index
                    || next.start != end
                    || next.created_offsets.contains(&self.offset)
                {
                    break;
                }
                next.created_offsets.insert(self.offset);
                run.count = count;
                run.groups += 1;
                self.cursor += 1;
            }
            return Some(run);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(groups: &mut [Group], offset: i32) -> Vec<MergedRun> {
        merge_groups(groups, offset, |_| true).collect()
    }

    #[test]
    fn contiguous_groups_of_one_technique_merge() {
        let mut groups = vec![Group::new(0, 6, 0), Group::new(6, 3, 0), Group::new(9, 3, 1)];
        let out = runs(&mut groups, 0);

        assert_eq!(out.len(), 2);
        assert_eq!((out[0].start, out[0].count, out[0].groups), (0, 9, 2));
        assert_eq!((out[1].start, out[1].count, out[1].technique_index), (9, 3, 1));
    }

    #[test]
    fn gaps_break_runs() {
        let mut groups = vec![Group::new(0, 3, 0), Group::new(4, 3, 0)];
        assert_eq!(runs(&mut groups, 0).len(), 2);
    }

    #[test]
    fn second_walk_for_same_offset_is_empty() {
        let mut groups = vec![Group::new(0, 3, 0), Group::new(3, 3, 0)];
        assert_eq!(runs(&mut groups, 0).len(), 1);
        assert!(runs(&mut groups, 0).is_empty());
        assert_eq!(runs(&mut groups, 1).len(), 1);
        assert!(groups.iter().all(|g| g.created_offsets.len() == 2));
    }

    #[test]
    fn rejected_groups_are_not_marked() {
        let mut groups = vec![Group::new(0, 3, 0), Group::new(3, 3, 1)];
        let out: Vec<_> = merge_groups(&mut groups, 0, |t| t == 1).collect();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].technique_index, 1);
        assert!(groups[0].created_offsets.is_empty());
    }

    #[test]
    fn already_created_group_stops_absorption() {
        let mut groups = vec![Group::new(0, 3, 0), Group::new(3, 3, 0)];
        groups[1].created_offsets.insert(0);
        let out = runs(&mut groups, 0);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].count, 3);
    }

    #[test]
    fn overflowing_ranges_end_the_run() {
        let mut groups = vec![
            Group::new(u32::MAX - 2, 2, 0),
            Group::new(u32::MAX, u32::MAX, 0),
            Group::new(u32::MAX, 5, 0),
        ];
        let out = runs(&mut groups, 0);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].count, 2);
        assert_eq!(out[1].count, u32::MAX);
    }

    #[test]
    fn run_keeps_head_render_order_offset() {
        let mut groups = vec![
            Group::new(0, 3, 0).with_render_order_offset(0.5),
            Group::new(3, 3, 0),
        ];
        assert_eq!(runs(&mut groups, 0)[0].render_order_offset, Some(0.5));
    }
}
