//! Seeding and front advancement.
//!
//! Processing a fringe point `R` flattens its neighborhood into the tangent
//! plane, sorts the neighbors by visibility and angle, walks the fan of
//! candidates between its two front neighbors and emits the triangles of
//! that fan. Fan steps wider than the maximum angle (or with an edge longer
//! than the search radius) are gaps, and gaps leave `R` on the boundary.

use std::cmp::Ordering;
use std::f64::consts::PI;

use nalgebra::Point2;

use super::TriangulationSession;
use crate::geometry::{
    TangentFrame, is_visible, is_visible_from, polar_angle, polar_angle_from, surface_angle,
};
use crate::search::{Neighbor, NeighborSearch};
use crate::state::PointState;

/// A neighbor placed around the processed point.
#[derive(Debug, Clone, Copy)]
struct NeighborAngle {
    angle: f64,
    index: usize,
    /// Position in the distance-ordered neighborhood.
    slot: usize,
    visible: bool,
}

/// The projected front edge of a neighbor already on a front.
#[derive(Debug, Clone, Copy)]
struct FrontEdge {
    slot: usize,
    first: Point2<f64>,
    second: Point2<f64>,
}

/// Which front links of the current point lead to its chain neighbors.
#[derive(Debug, Clone, Copy)]
struct LinkFlags {
    prev_first: bool,
    prev_second: bool,
    next_first: bool,
    next_second: bool,
}

/// One step of the fan walk.
#[derive(Debug, Clone, Copy)]
struct Step {
    cur: usize,
    prev: usize,
    next: usize,
    next_next: Option<usize>,
    is_free: bool,
    flags: Option<LinkFlags>,
    uv_cur: Point2<f64>,
    uv_prev: Point2<f64>,
    uv_next: Point2<f64>,
}

/// Candidate fan of the processed point. `chain` holds positions into the
/// sorted neighbor list; the flags are indexed by those positions.
#[derive(Debug)]
struct Fan {
    chain: Vec<usize>,
    gaps: Vec<bool>,
    skinny: Vec<bool>,
    dif: Vec<f64>,
}

fn by_visibility_then_angle(a: &NeighborAngle, b: &NeighborAngle) -> Ordering {
    b.visible
        .cmp(&a.visible)
        .then_with(|| a.angle.partial_cmp(&b.angle).unwrap_or(Ordering::Equal))
}

impl<S: NeighborSearch> TriangulationSession<S> {
    /// Tries to start a component at `r`.
    ///
    /// `r` is marked unreachable first; it only joins the mesh if two of its
    /// free neighbors form a triangle with it.
    pub(super) fn seed_component(&mut self, r: usize) {
        self.state[r] = PointState::Unreachable;
        let nb = self.neighborhood(r);
        let n = nb.len();
        if n < 3 {
            return;
        }

        let sqr_radius = self.params.sqr_search_radius();
        let threshold = sqr_radius.min(self.params.mu * self.params.mu * nb[1].sqr_distance);
        let frame = self.frame(r);

        let mut uv = vec![Point2::origin(); n];
        let mut visible = vec![false; n];
        let mut edges = Vec::new();
        for i in 1..n {
            let idx = nb[i].index;
            uv[i] = frame.project(&self.position(idx));
            let st = self.state[idx];
            visible[i] = !(st.is_meshed()
                || st == PointState::Unreachable
                || nb[i].sqr_distance > threshold);
            if matches!(st, PointState::Fringe | PointState::Boundary) {
                if let Some(edge) = self.front_edge(&frame, idx, i) {
                    edges.push(edge);
                }
            }
        }

        for i in 1..n {
            if !visible[i] {
                continue;
            }
            let idx = nb[i].index;
            visible[i] = edges.iter().all(|e| {
                let jdx = nb[e.slot].index;
                (self.ffn[jdx] == Some(idx) || is_visible(&uv[i], &uv[e.slot], &e.first))
                    && (self.sfn[jdx] == Some(idx) || is_visible(&uv[i], &uv[e.slot], &e.second))
            });
        }

        let usable = |i: usize| visible[i] && self.state[nb[i].index] == PointState::Free;
        let pair = (1..n).filter(|&i| usable(i)).find_map(|left| {
            (left + 1..n)
                .filter(|&i| usable(i))
                .find(|&right| self.sqr_dist(nb[left].index, nb[right].index) <= sqr_radius)
                .map(|right| (nb[left].index, nb[right].index))
        });
        if let Some((l, rt)) = pair {
            self.open_component(r, l, rt);
        }
    }

    fn open_component(&mut self, r: usize, l: usize, rt: usize) {
        self.part[r] = Some(self.components);
        self.components += 1;

        self.add_fringe(rt, r);
        self.add_fringe(l, rt);
        self.add_fringe(r, l);
        for v in [r, l, rt] {
            self.state[v] = PointState::Fringe;
        }

        self.ffn[r] = Some(l);
        self.sfn[r] = Some(rt);
        self.ffn[l] = Some(rt);
        self.sfn[l] = Some(r);
        self.ffn[rt] = Some(r);
        self.sfn[rt] = Some(l);

        self.add_triangle(r, l, rt);
    }

    fn front_edge(&self, frame: &TangentFrame, idx: usize, slot: usize) -> Option<FrontEdge> {
        let (f, s) = (self.ffn[idx]?, self.sfn[idx]?);
        Some(FrontEdge {
            slot,
            first: frame.project(&self.position(f)),
            second: frame.project(&self.position(s)),
        })
    }

    /// Advances the front at fringe point `r`.
    pub(super) fn process_fringe(&mut self, r: usize) {
        if self.ffn[r] == self.sfn[r] {
            self.state[r] = PointState::Completed;
            return;
        }
        let (Some(f_r), Some(s_r), Some(src)) = (self.ffn[r], self.sfn[r], self.source[r]) else {
            self.state[r] = PointState::Boundary;
            return;
        };

        let nb = self.neighborhood(r);
        let n = nb.len();
        if n < 3 {
            self.state[r] = PointState::Boundary;
            return;
        }

        let farthest = nb[n - 1].sqr_distance;
        let max_front = self.sqr_dist(r, f_r).max(self.sqr_dist(r, s_r));
        if max_front > farthest || self.sqr_dist(r, src) > farthest {
            self.note_front_outside_search(r);
            self.state[r] = PointState::Boundary;
            return;
        }

        let frame = self.frame(r);
        let (uv, mut angles) = self.place_neighbors(r, f_r, s_r, &nb, &frame);
        angles.sort_by(by_visibility_then_angle);

        if !angles[2].visible {
            self.close_loop(r, src, &angles, &frame);
            return;
        }

        let Some(start) = angles.iter().position(|a| a.index == f_r || a.index == s_r) else {
            self.state[r] = PointState::Boundary;
            return;
        };
        let other = if angles[start].index == f_r { s_r } else { f_r };
        let end = angles[start + 1..]
            .iter()
            .position(|a| a.index == other)
            .map_or(n, |k| start + 1 + k);
        if end >= n || !angles[start].visible || !angles[end].visible {
            self.state[r] = PointState::Boundary;
            return;
        }

        let mut last_visible = end;
        while last_visible + 1 < n && angles[last_visible + 1].visible {
            last_visible += 1;
        }

        let (start, end) =
            if self.needs_inversion(src, f_r, s_r, &nb, &angles, start, end, last_visible) {
                (end, start)
            } else {
                (start, end)
            };

        let mut fan = self.build_fan(&angles, start, end, last_visible);
        let has_gap = fan.chain[..fan.chain.len() - 1]
            .iter()
            .any(|&c| fan.gaps[c]);
        self.state[r] = if has_gap {
            PointState::Boundary
        } else {
            PointState::Completed
        };

        // Everything between the first and the last gap stays open.
        let gap_positions: Vec<usize> = (0..fan.chain.len() - 1)
            .filter(|&p| fan.gaps[fan.chain[p]])
            .collect();
        if let (Some(&first), Some(&last)) = (gap_positions.first(), gap_positions.last()) {
            if first != last {
                fan.chain.drain(first + 1..=last);
            }
        }

        if fan.chain.iter().any(|&c| fan.skinny[c]) {
            self.prune_skinny(&angles, &frame, &mut fan);
        }

        self.walk_fan(r, &angles, &uv, &fan);
    }

    /// Projects the neighborhood of `r` and decides which neighbors `r`
    /// may connect to.
    fn place_neighbors(
        &self,
        r: usize,
        f_r: usize,
        s_r: usize,
        nb: &[Neighbor],
        frame: &TangentFrame,
    ) -> (Vec<Point2<f64>>, Vec<NeighborAngle>) {
        let n = nb.len();
        let threshold = self
            .params
            .sqr_search_radius()
            .min(self.params.mu * self.params.mu * nb[1].sqr_distance);
        let normal = self.normals[r];

        let mut uv = vec![Point2::origin(); n];
        let mut angles = Vec::with_capacity(n);
        angles.push(NeighborAngle {
            angle: 0.0,
            index: r,
            slot: 0,
            visible: false,
        });
        let mut edges = Vec::new();

        for i in 1..n {
            let idx = nb[i].index;
            uv[i] = frame.project(&self.position(idx));
            let st = self.state[idx];

            let mut entry = NeighborAngle {
                angle: polar_angle(&uv[i]),
                index: idx,
                slot: i,
                visible: !(st.is_meshed()
                    || st == PointState::Unreachable
                    || nb[i].sqr_distance > threshold),
            };
            if idx == f_r || idx == s_r {
                entry.visible = true;
            }
            let deviates = surface_angle(&normal, &self.normals[idx], self.params.normal_consistency)
                > self.params.maximum_surface_angle;
            if deviates {
                entry.visible = false;
            }

            if !deviates && matches!(st, PointState::Fringe | PointState::Boundary) {
                if let Some(edge) = self.front_edge(frame, idx, i) {
                    edges.push(edge);
                    if st == PointState::Fringe
                        && idx != f_r
                        && idx != s_r
                        && self.faces_away(frame, idx, &uv[i], entry.angle, &edge)
                    {
                        entry.visible = false;
                    }
                }
            }
            angles.push(entry);
        }

        // Drop candidates whose connecting segment would cross a front edge.
        for i in 1..n {
            let idx = angles[i].index;
            if !angles[i].visible || idx == f_r || idx == s_r {
                continue;
            }
            let blocked = edges.iter().filter(|e| e.slot != i).any(|e| {
                let jdx = nb[e.slot].index;
                let crosses = |link: Option<usize>, end: &Point2<f64>| {
                    link != Some(idx) && link != Some(r) && !is_visible(&uv[i], &uv[e.slot], end)
                };
                crosses(self.ffn[jdx], &e.first) || crosses(self.sfn[jdx], &e.second)
            });
            angles[i].visible = !blocked;
        }

        (uv, angles)
    }

    /// Does `r` lie on the already meshed side of the fringe neighbor `idx`?
    ///
    /// Compares the direction back to `r` with the wedge spanned by the
    /// neighbor's front edge, using the neighbor's source to tell which side
    /// of the wedge is meshed.
    fn faces_away(
        &self,
        frame: &TangentFrame,
        idx: usize,
        uv: &Point2<f64>,
        angle: f64,
        edge: &FrontEdge,
    ) -> bool {
        let a1 = polar_angle_from(uv, &edge.first);
        let a2 = polar_angle_from(uv, &edge.second);
        let (lo, hi) = if a1 < a2 { (a1, a2) } else { (a2, a1) };

        let mut toward_r = angle + PI;
        if toward_r >= PI {
            toward_r -= 2.0 * PI;
        }
        let inside = lo < toward_r && toward_r < hi;
        let outside = toward_r < lo || hi < toward_r;

        let source_inside = match self.source[idx] {
            Some(ns) if Some(ns) != self.ffn[idx] && Some(ns) != self.sfn[idx] => {
                let a_s = polar_angle_from(uv, &frame.project(&self.position(ns)));
                lo < a_s && a_s < hi
            }
            _ => hi - lo < PI,
        };

        if source_inside { inside } else { outside }
    }

    /// Should the walk run from the end towards the start?
    #[allow(clippy::too_many_arguments)]
    fn needs_inversion(
        &self,
        src: usize,
        f_r: usize,
        s_r: usize,
        nb: &[Neighbor],
        angles: &[NeighborAngle],
        start: usize,
        end: usize,
        last_visible: usize,
    ) -> bool {
        let (a_start, a_end) = (angles[start].angle, angles[end].angle);
        if src == f_r || src == s_r {
            return a_end - a_start < PI;
        }
        if let Some(sidx) = angles.iter().position(|a| a.index == src) {
            return a_start < angles[sidx].angle && angles[sidx].angle < a_end;
        }

        let n = nb.len();
        let mut visible_free = None;
        let mut nearest_meshed = None;
        for i in 1..n {
            if self.state[nb[i].index].is_meshed() && nearest_meshed.is_none() {
                nearest_meshed = Some(i);
                if visible_free.is_some() {
                    break;
                }
            }
            if self.state[angles[i].index].is_unconnected() && i <= last_visible {
                visible_free = Some(i);
                if nearest_meshed.is_some() {
                    break;
                }
            }
        }

        if let Some(vf) = visible_free {
            return vf < start || vf > end;
        }
        let Some(n_cb) =
            nearest_meshed.and_then(|k| angles.iter().position(|a| a.index == nb[k].index))
        else {
            return start + 1 == end;
        };

        if n_cb != start && n_cb != end {
            return a_start < angles[n_cb].angle && angles[n_cb].angle < a_end;
        }

        let mut inside = false;
        let mut outside = false;
        for (i, a) in angles.iter().enumerate() {
            if i == start || i == end || !self.state[a.index].is_meshed() {
                continue;
            }
            if a_start <= a.angle && a.angle <= a_end {
                inside = true;
                if outside {
                    break;
                }
            } else {
                outside = true;
                if inside {
                    break;
                }
            }
        }
        match (inside, outside) {
            (true, false) => true,
            (false, true) => false,
            _ => a_end - a_start < PI,
        }
    }

    /// Collects the chain from `start` to `end`, flagging gaps and skinny
    /// steps.
    fn build_fan(
        &self,
        angles: &[NeighborAngle],
        start: usize,
        end: usize,
        last_visible: usize,
    ) -> Fan {
        let n = angles.len();
        let sqr_radius = self.params.sqr_search_radius();
        let mut fan = Fan {
            chain: Vec::with_capacity(n),
            gaps: vec![false; n],
            skinny: vec![false; n],
            dif: vec![0.0; n],
        };

        let mut classify = |j: usize, next: usize, d: f64| {
            fan.dif[j] = d;
            if d < self.params.minimum_angle {
                fan.skinny[j] = true;
            } else if self.params.maximum_angle <= d {
                fan.gaps[j] = true;
            }
            if !fan.gaps[j] && self.sqr_dist(angles[next].index, angles[j].index) > sqr_radius {
                fan.gaps[j] = true;
            }
            fan.chain.push(j);
        };

        if start > end {
            for j in start..last_visible {
                classify(j, j + 1, angles[j + 1].angle - angles[j].angle);
            }
            classify(
                last_visible,
                0,
                2.0 * PI + angles[0].angle - angles[last_visible].angle,
            );
            for j in 0..end {
                classify(j, j + 1, angles[j + 1].angle - angles[j].angle);
            }
        } else {
            for j in start..end {
                classify(j, j + 1, angles[j + 1].angle - angles[j].angle);
            }
        }
        fan.chain.push(end);
        fan
    }

    /// Merges skinny fan steps while the merged wedge stays narrow enough,
    /// no dropped point would end up inside the merged triangle, and the
    /// new edge stays within the search radius.
    fn prune_skinny(&self, angles: &[NeighborAngle], frame: &TangentFrame, fan: &mut Fan) {
        let max_combined = self
            .params
            .maximum_angle
            .min(PI - 2.0 * self.params.minimum_angle);
        let sqr_radius = self.params.sqr_search_radius();
        let mut erased = vec![false; angles.len()];
        let mut so_far = 0.0;

        for p in 1..fan.chain.len() - 1 {
            let (ci, pi, ni) = (fan.chain[p], fan.chain[p - 1], fan.chain[p + 1]);
            so_far = if fan.gaps[pi] { 0.0 } else { so_far + fan.dif[pi] };
            let would = if fan.gaps[ci] { so_far } else { so_far + fan.dif[ci] };

            let st = self.state[angles[ci].index];
            let farther_than_next = angles[ci].slot > angles[ni].slot;
            let mergeable = (fan.skinny[ci] || fan.skinny[pi])
                && (st.is_unconnected() || st == PointState::Fringe)
                && (!fan.gaps[ci] || farther_than_next)
                && (!fan.gaps[pi] || farther_than_next)
                && would < max_combined;
            if !mergeable {
                so_far = 0.0;
                continue;
            }

            let mut q = p - 1;
            while q > 0 && erased[fan.chain[q]] {
                q -= 1;
            }
            let keep = fan.chain[q];

            if fan.gaps[pi] {
                fan.gaps[ci] = true;
                erased[ci] = true;
            } else if fan.gaps[ci] {
                fan.gaps[keep] = true;
                erased[ci] = true;
            } else {
                let (keep_idx, next_idx) = (angles[keep].index, angles[ni].index);
                let s1 = frame.project(&self.position(keep_idx));
                let s2 = frame.project(&self.position(next_idx));
                let ok = self.sqr_dist(keep_idx, next_idx) <= sqr_radius
                    && (q + 1..=p).all(|t| {
                        let x = frame.project(&self.position(angles[fan.chain[t]].index));
                        !is_visible(&x, &s1, &s2)
                    });
                if ok {
                    erased[ci] = true;
                } else {
                    so_far = 0.0;
                }
            }
        }

        fan.chain.retain(|&c| !erased[c]);
    }

    /// Emits the fan triangles around `r` and relinks the fronts.
    fn walk_fan(&mut self, r: usize, angles: &[NeighborAngle], uv: &[Point2<f64>], fan: &Fan) {
        let chain = &fan.chain;
        let len = chain.len();
        let origin = Point2::origin();
        self.already_connected = false;

        for p in 1..len - 1 {
            let (cur_a, prev_a, next_a) =
                (angles[chain[p]], angles[chain[p - 1]], angles[chain[p + 1]]);
            let cur = cur_a.index;
            let gap_before = fan.gaps[chain[p - 1]];
            let gap_after = fan.gaps[chain[p]];

            let mut is_free = false;
            let mut flags = None;
            if self.state[cur].is_unconnected() {
                self.state[cur] = PointState::Fringe;
                is_free = true;
            } else if !self.already_connected {
                flags = Some(LinkFlags {
                    prev_first: self.ffn[cur] == Some(prev_a.index) && !gap_before,
                    prev_second: self.sfn[cur] == Some(prev_a.index) && !gap_before,
                    next_first: self.ffn[cur] == Some(next_a.index) && !gap_after,
                    next_second: self.sfn[cur] == Some(next_a.index) && !gap_after,
                });
            }

            let mut step = Step {
                cur,
                prev: prev_a.index,
                next: next_a.index,
                next_next: None,
                is_free,
                flags,
                uv_cur: uv[cur_a.slot],
                uv_prev: uv[prev_a.slot],
                uv_next: uv[next_a.slot],
            };

            match (gap_before, gap_after) {
                (true, true) => {
                    if is_free {
                        self.state[cur] = PointState::Unreachable;
                    }
                }
                (false, true) => {
                    // The fan closes after `cur`: it becomes the front
                    // neighbor of `r` on this side.
                    self.add_triangle(cur, prev_a.index, r);
                    self.add_fringe(cur, r);
                    step.next = r;
                    step.next_next = Some(next_a.index);
                    step.uv_next = origin;
                    self.connect_or_skip(r, &step);
                    self.replace_link(r, angles[chain[0]].index, cur);
                }
                (true, false) => {
                    self.add_fringe(cur, r);
                    step.prev = r;
                    step.uv_prev = origin;
                    step.next_next = chain.get(p + 2).map(|&c| angles[c].index);
                    self.connect_or_skip(r, &step);
                    self.replace_link(r, angles[chain[len - 1]].index, cur);
                }
                (false, false) => {
                    self.add_triangle(cur, prev_a.index, r);
                    self.add_fringe(cur, r);
                    step.next_next = if p + 2 >= len {
                        None
                    } else if fan.gaps[chain[p + 1]] {
                        Some(r)
                    } else {
                        Some(angles[chain[p + 2]].index)
                    };
                    self.connect_or_skip(r, &step);
                }
            }
        }

        if self.ffn[r] == self.sfn[r] {
            self.state[r] = PointState::Completed;
        }

        let last = angles[chain[len - 1]].index;
        let before_last = angles[chain[len - 2]].index;
        if !fan.gaps[chain[len - 2]] {
            self.add_triangle(before_last, last, r);
            self.add_fringe(before_last, r);
            self.relink(last, r, before_last);
        }
        if !fan.gaps[chain[0]] {
            self.relink(angles[chain[0]].index, r, angles[chain[1]].index);
        }
    }

    fn connect_or_skip(&mut self, r: usize, step: &Step) {
        if self.already_connected {
            self.already_connected = false;
        } else {
            self.connect_point(r, step);
        }
    }

    /// Updates the front links of `step.cur` after the fan triangle at it.
    ///
    /// A point that was already on another front may need one extra
    /// triangle to close the wedge between its old front and the new one.
    fn connect_point(&mut self, r: usize, step: &Step) {
        let Step { cur, prev, next, .. } = *step;
        if step.is_free {
            self.ffn[cur] = Some(prev);
            self.sfn[cur] = Some(next);
            return;
        }
        let Some(flags) = step.flags else {
            return;
        };
        let LinkFlags {
            prev_first,
            prev_second,
            next_first,
            next_second,
        } = flags;

        if (prev_first && next_second) || (prev_second && next_first) {
            self.state[cur] = PointState::Completed;
            return;
        }
        if prev_first && !next_second {
            self.ffn[cur] = Some(next);
            return;
        }
        if next_first && !prev_second {
            self.ffn[cur] = Some(prev);
            return;
        }
        if prev_second && !next_first {
            self.sfn[cur] = Some(next);
            return;
        }
        if next_second && !prev_first {
            self.sfn[cur] = Some(prev);
            return;
        }

        let (Some(f), Some(s)) = (self.ffn[cur], self.sfn[cur]) else {
            return;
        };
        let sqr_radius = self.params.sqr_search_radius();
        let short = |a: usize, b: usize| self.sqr_dist(a, b) <= sqr_radius;

        // A triangle already closes on one side.
        if prev != r && self.has_link(prev, f) && short(f, prev) {
            self.add_triangle(cur, f, prev);
            self.state[prev] = PointState::Completed;
            self.state[f] = PointState::Completed;
            self.ffn[cur] = Some(next);
            return;
        }
        if prev != r && self.has_link(prev, s) && short(s, prev) {
            self.add_triangle(cur, s, prev);
            self.state[prev] = PointState::Completed;
            self.state[s] = PointState::Completed;
            self.sfn[cur] = Some(next);
            return;
        }
        if !self.state[next].is_unconnected() {
            if self.has_link(next, f) && short(f, next) {
                self.add_triangle(cur, f, next);
                self.replace_link(next, f, cur);
                self.state[f] = PointState::Completed;
                self.ffn[cur] = Some(prev);
                return;
            }
            if self.has_link(next, s) && short(s, next) {
                self.add_triangle(cur, s, next);
                self.replace_link(next, s, cur);
                self.state[s] = PointState::Completed;
                self.sfn[cur] = Some(prev);
                return;
            }
        }

        // Fill the wedge between the old front and the new one with the
        // shortest legal edge.
        let frame = self.frame(r);
        let uf = frame.project(&self.position(f));
        let us = frame.project(&self.position(s));
        let (uc, up, un) = (step.uv_cur, step.uv_prev, step.uv_next);
        let prev_ok = prev != r;
        let next_ok = self.state[next].is_unconnected() && step.next_next.is_some();

        // (toward_prev, via_first)
        let candidates = [
            (true, true, prev_ok),
            (true, false, prev_ok),
            (false, true, next_ok),
            (false, false, next_ok),
        ];
        let mut best: Option<(f64, bool, bool)> = None;
        for (toward_prev, via_first, allowed) in candidates {
            if !allowed {
                continue;
            }
            let (x, other) = if toward_prev { (&up, &un) } else { (&un, &up) };
            let (link_uv, other_link_uv) = if via_first { (&uf, &us) } else { (&us, &uf) };
            if !(is_visible_from(x, other, &uc, link_uv)
                && is_visible_from(x, other_link_uv, &uc, link_uv))
            {
                continue;
            }
            let link = if via_first { f } else { s };
            let end = if toward_prev { prev } else { next };
            let d = self.sqr_dist(link, end);
            if d > sqr_radius {
                continue;
            }
            if best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, toward_prev, via_first));
            }
        }

        let Some((_, toward_prev, via_first)) = best else {
            return;
        };
        let link = if via_first { f } else { s };
        if toward_prev {
            self.add_triangle(cur, link, prev);
            self.replace_link(prev, cur, link);
            self.replace_link(link, cur, prev);
            self.set_link(cur, via_first, next);
        } else {
            self.add_triangle(cur, link, next);
            self.state[next] = PointState::Fringe;
            self.ffn[next] = step.next_next;
            self.sfn[next] = Some(link);
            self.replace_link(link, cur, next);
            self.set_link(cur, via_first, prev);
            self.already_connected = true;
        }
    }

    fn set_link(&mut self, v: usize, first: bool, to: usize) {
        if first {
            self.ffn[v] = Some(to);
        } else {
            self.sfn[v] = Some(to);
        }
    }

    /// Only the two front neighbors of `r` are visible: close the front
    /// with one triangle if the angles allow it.
    fn close_loop(&mut self, r: usize, src: usize, angles: &[NeighborAngle], frame: &TangentFrame) {
        let (a, b) = (angles[0].index, angles[1].index);
        if !self.links_are(r, a, b) {
            self.state[r] = PointState::Boundary;
            return;
        }

        // Three points whose fronts only reference each other and whose
        // triangle exists: a closed 3-point loop.
        if self.links_are(a, r, b) && self.links_are(b, r, a) && self.is_emitted(r, a, b) {
            for v in [r, a, b] {
                self.state[v] = PointState::Completed;
            }
            return;
        }

        if src == a || src == b || self.sqr_dist(a, b) > self.params.sqr_search_radius() {
            self.state[r] = PointState::Boundary;
            return;
        }

        let a_s = polar_angle(&frame.project(&self.position(src)));
        let d = angles[1].angle - angles[0].angle;
        let max_angle = self.params.maximum_angle;
        let closes = if angles[0].angle < a_s && a_s < angles[1].angle {
            d >= 2.0 * PI - max_angle
        } else {
            d < max_angle
        };

        if closes {
            self.close_triangle(r, a, b);
        } else {
            self.state[r] = PointState::Boundary;
        }
    }

    fn close_triangle(&mut self, r: usize, a: usize, b: usize) {
        self.state[r] = PointState::Completed;
        self.add_triangle(a, b, r);
        self.relink(a, r, b);
        self.relink(b, r, a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::GreedyParams;
    use crate::pointcloud::PointCloud;
    use crate::search::{BruteForceSearch, SearchIndex};
    use mesh_types::face_key;
    use nalgebra::{Point3, Vector3};

    fn params() -> GreedyParams {
        GreedyParams::new()
            .with_mu(2.5)
            .with_search_radius(2.0)
            .with_max_nearest_neighbors(10)
            .with_minimum_angle(PI / 18.0)
            .with_maximum_angle(2.0 * PI / 3.0)
            .with_maximum_surface_angle(PI / 4.0)
    }

    fn triangle_cloud() -> PointCloud {
        let h = 3.0_f64.sqrt() / 2.0;
        let mut cloud = PointCloud::new();
        cloud.add_point(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        cloud.add_point(Point3::new(1.0, 0.0, 0.0), Vector3::z());
        cloud.add_point(Point3::new(0.5, h, 0.0), Vector3::z());
        cloud
    }

    fn session(cloud: PointCloud) -> TriangulationSession<BruteForceSearch> {
        let search = BruteForceSearch::build(&cloud);
        TriangulationSession::new(cloud, search, params()).unwrap()
    }

    #[test]
    fn test_sort_puts_visible_first_and_is_stable() {
        let entry = |angle, index, visible| NeighborAngle {
            angle,
            index,
            slot: index,
            visible,
        };
        let mut angles = vec![
            entry(-1.0, 0, false),
            entry(0.5, 1, true),
            entry(-0.5, 2, true),
            entry(0.5, 3, true),
        ];
        angles.sort_by(by_visibility_then_angle);
        let order: Vec<usize> = angles.iter().map(|a| a.index).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);
    }

    #[test]
    fn test_seed_links_triangle() {
        let mut session = session(triangle_cloud());
        session.seed_component(0);

        // The apex sits a rounding error closer to 0 than point 1 does,
        // so only winding-independent facts are stable here.
        assert_eq!(session.faces().len(), 1);
        assert_eq!(face_key(session.faces()[0]), [0, 1, 2]);
        for v in 0..3 {
            let mut links = [session.ffn[v].unwrap(), session.sfn[v].unwrap()];
            links.sort_unstable();
            let others: Vec<usize> = (0..3).filter(|&o| o != v).collect();
            assert_eq!(links.to_vec(), others, "links of {v}");
        }
        assert!(session.state.iter().all(|&s| s == PointState::Fringe));
        assert_eq!(session.part, vec![Some(0); 3]);
        assert_eq!(session.component_count(), 1);
    }

    #[test]
    fn test_three_point_loop_completes() {
        let mut session = session(triangle_cloud());
        session.run();

        assert_eq!(session.faces().len(), 1);
        assert!(
            session
                .point_states()
                .iter()
                .all(|&s| s == PointState::Completed)
        );
    }

    #[test]
    fn test_seed_fails_when_pair_too_far() {
        let mut cloud = PointCloud::new();
        cloud.add_point(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        cloud.add_point(Point3::new(1.9, 0.0, 0.0), Vector3::z());
        cloud.add_point(Point3::new(-1.9, 0.0, 0.0), Vector3::z());
        let mut session = session(cloud);
        session.seed_component(0);

        assert!(session.faces().is_empty());
        assert_eq!(session.state[0], PointState::Unreachable);
        assert_eq!(session.part[0], None);
        assert_eq!(session.component_count(), 0);
    }

    #[test]
    fn test_relink_completes_closed_point() {
        let mut session = session(triangle_cloud());
        session.ffn[0] = Some(1);
        session.sfn[0] = Some(2);
        session.relink(0, 1, 2);
        assert_eq!(session.state[0], PointState::Completed);

        session.ffn[1] = Some(0);
        session.sfn[1] = None;
        session.relink(1, 0, 2);
        assert_eq!(session.state[1], PointState::Free);
        assert_eq!(session.ffn[1], Some(2));

        session.sfn[1] = Some(0);
        session.relink(1, 0, 2);
        assert_eq!(session.state[1], PointState::Completed);
    }

    #[test]
    fn test_add_triangle_skips_repeated_vertex_set() {
        let mut session = session(triangle_cloud());
        session.add_triangle(0, 1, 2);
        session.add_triangle(2, 0, 1);
        session.add_triangle(1, 0, 2);
        assert_eq!(session.faces().len(), 1);
    }

    #[test]
    fn test_add_fringe_sets_source_once() {
        let mut session = session(triangle_cloud());
        session.part[0] = Some(0);
        session.part[1] = Some(0);
        session.add_fringe(2, 0);
        session.add_fringe(2, 1);

        assert_eq!(session.source[2], Some(0));
        assert_eq!(session.part[2], Some(0));
        assert_eq!(session.queue.iter().filter(|&&v| v == 2).count(), 1);
    }
}
