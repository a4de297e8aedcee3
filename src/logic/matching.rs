//! Weighted matching on general graphs (Edmonds' blossom algorithm with
//! primal-dual updates, O(n^3)). Only integer weights are supported, which
//! keeps every dual variable and slack exact.
//!
//! Vertices are `0..vertex_count`. Edges are `(u, v, weight)` with `u != v`.
//! Edge `k` has two endpoints, `2k` (for `u`) and `2k + 1` (for `v`), so the
//! remote endpoint of `p` is `p ^ 1`.

use std::time::Instant;

/// The solver ran past its deadline before reaching an optimum.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeadlineExceeded;

/// Sentinel for "no vertex / edge / endpoint / blossom".
const NONE: usize = usize::MAX;

const FREE: u8 = 0;
const S: u8 = 1;
const T: u8 = 2;
/// Temporary mark used while scanning for a common base.
const BREADCRUMB: u8 = 4;

/// Minimum-weight perfect matching.
///
/// Returns `Ok(None)` when the graph has no perfect matching. Pairs come back
/// ordered by their lower vertex, lower vertex first.
pub fn min_weight_perfect_matching(
    vertex_count: usize,
    edges: &[(usize, usize, i64)],
    deadline: Option<Instant>,
) -> Result<Option<Vec<(usize, usize)>>, DeadlineExceeded> {
    if vertex_count % 2 == 1 {
        return Ok(None);
    }
    if vertex_count == 0 {
        return Ok(Some(Vec::new()));
    }
    let mut degree = vec![0usize; vertex_count];
    for &(u, v, _) in edges {
        degree[u] += 1;
        degree[v] += 1;
    }
    if degree.contains(&0) {
        return Ok(None);
    }

    // Among maximum-cardinality matchings, maximizing sum(K - w) minimizes sum(w).
    let ceiling = edges.iter().map(|&(_, _, w)| w).max().unwrap_or(0) + 1;
    let flipped: Vec<_> = edges.iter().map(|&(u, v, w)| (u, v, ceiling - w)).collect();
    let mate = max_weight_matching(vertex_count, &flipped, true, deadline)?;

    let mut pairs = Vec::with_capacity(vertex_count / 2);
    for (v, partner) in mate.iter().enumerate() {
        match partner {
            None => return Ok(None),
            Some(w) if v < *w => pairs.push((v, *w)),
            Some(_) => {}
        }
    }
    Ok(Some(pairs))
}

/// Maximum-weight matching. With `max_cardinality`, the maximum weight is
/// taken over maximum-cardinality matchings only.
///
/// Returns the partner of each vertex, if any.
pub fn max_weight_matching(
    vertex_count: usize,
    edges: &[(usize, usize, i64)],
    max_cardinality: bool,
    deadline: Option<Instant>,
) -> Result<Vec<Option<usize>>, DeadlineExceeded> {
    if edges.is_empty() {
        return Ok(vec![None; vertex_count]);
    }
    let mut solver = Blossom::new(vertex_count, edges);
    solver.solve(max_cardinality, deadline)?;
    Ok(solver
        .mate
        .iter()
        .map(|&p| (p != NONE).then(|| solver.endpoint[p]))
        .collect())
}

struct Blossom {
    n: usize,
    edges: Vec<(usize, usize, i64)>,
    /// `endpoint[p]` is the vertex at endpoint `p`.
    endpoint: Vec<usize>,
    /// Remote endpoints of the edges incident to each vertex.
    neighbend: Vec<Vec<usize>>,
    /// Remote endpoint of the matched edge, per vertex.
    mate: Vec<usize>,
    /// Label of each vertex and top-level blossom.
    label: Vec<u8>,
    /// Endpoint through which the label was reached.
    labelend: Vec<usize>,
    /// Top-level blossom containing each vertex.
    inblossom: Vec<usize>,
    blossomparent: Vec<usize>,
    /// Sub-blossoms in cyclic order, starting with the base.
    blossomchilds: Vec<Vec<usize>>,
    blossombase: Vec<usize>,
    /// `blossomendps[b][i]` connects `blossomchilds[b][i]` to the next child.
    blossomendps: Vec<Vec<usize>>,
    /// Least-slack edge to a different S-blossom (or free vertex).
    bestedge: Vec<usize>,
    blossombestedges: Vec<Option<Vec<usize>>>,
    unusedblossoms: Vec<usize>,
    /// Vertex duals are `dualvar[0..n]`, blossom duals `dualvar[n..2n]`.
    dualvar: Vec<i64>,
    /// Edges known to have zero slack.
    allowedge: Vec<bool>,
    queue: Vec<usize>,
}

impl Blossom {
    fn new(n: usize, edges: &[(usize, usize, i64)]) -> Self {
        let max_weight = edges.iter().map(|&(_, _, w)| w).max().unwrap_or(0).max(0);
        let endpoint = (0..2 * edges.len())
            .map(|p| {
                let (u, v, _) = edges[p / 2];
                if p % 2 == 0 {
                    u
                } else {
                    v
                }
            })
            .collect();
        let mut neighbend = vec![Vec::new(); n];
        for (k, &(u, v, _)) in edges.iter().enumerate() {
            neighbend[u].push(2 * k + 1);
            neighbend[v].push(2 * k);
        }
        let mut blossombase: Vec<usize> = (0..n).collect();
        blossombase.extend(std::iter::repeat(NONE).take(n));
        let mut dualvar = vec![max_weight; n];
        dualvar.extend(std::iter::repeat(0).take(n));
        Self {
            n,
            edges: edges.to_vec(),
            endpoint,
            neighbend,
            mate: vec![NONE; n],
            label: vec![FREE; 2 * n],
            labelend: vec![NONE; 2 * n],
            inblossom: (0..n).collect(),
            blossomparent: vec![NONE; 2 * n],
            blossomchilds: vec![Vec::new(); 2 * n],
            blossombase,
            blossomendps: vec![Vec::new(); 2 * n],
            bestedge: vec![NONE; 2 * n],
            blossombestedges: vec![None; 2 * n],
            unusedblossoms: (n..2 * n).collect(),
            dualvar,
            allowedge: vec![false; edges.len()],
            queue: Vec::new(),
        }
    }

    /// Twice the reduced cost of edge `k`.
    fn slack(&self, k: usize) -> i64 {
        let (u, v, w) = self.edges[k];
        self.dualvar[u] + self.dualvar[v] - 2 * w
    }

    fn blossom_leaves(&self, b: usize) -> Vec<usize> {
        let mut leaves = Vec::new();
        self.collect_leaves(b, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, b: usize, leaves: &mut Vec<usize>) {
        if b < self.n {
            leaves.push(b);
        } else {
            for &child in &self.blossomchilds[b] {
                self.collect_leaves(child, leaves);
            }
        }
    }

    /// Cyclic index into the children of `b` (negative values wrap).
    fn child_at(&self, b: usize, j: isize) -> usize {
        let children = &self.blossomchilds[b];
        children[j.rem_euclid(children.len() as isize) as usize]
    }

    fn endp_at(&self, b: usize, j: isize) -> usize {
        let endps = &self.blossomendps[b];
        endps[j.rem_euclid(endps.len() as isize) as usize]
    }

    /// Label vertex `w` (and its top-level blossom) with `t`, reached via
    /// endpoint `p`. A T label propagates an S label to the mate of the base.
    fn assign_label(&mut self, w: usize, t: u8, p: usize) {
        let b = self.inblossom[w];
        self.label[w] = t;
        self.label[b] = t;
        self.labelend[w] = p;
        self.labelend[b] = p;
        self.bestedge[w] = NONE;
        self.bestedge[b] = NONE;
        if t == S {
            let leaves = self.blossom_leaves(b);
            self.queue.extend(leaves);
        } else if t == T {
            let base = self.blossombase[b];
            let mate = self.mate[base];
            self.assign_label(self.endpoint[mate], S, mate ^ 1);
        }
    }

    /// Trace back from `v` and `w` to find a new blossom's base, or `NONE`
    /// if the two paths reach different roots (augmenting path).
    fn scan_blossom(&mut self, v: usize, w: usize) -> usize {
        let mut path = Vec::new();
        let mut base = NONE;
        let (mut v, mut w) = (v, w);
        while v != NONE || w != NONE {
            let mut b = self.inblossom[v];
            if self.label[b] & BREADCRUMB != 0 {
                base = self.blossombase[b];
                break;
            }
            path.push(b);
            self.label[b] = S | BREADCRUMB;
            if self.labelend[b] == NONE {
                v = NONE;
            } else {
                v = self.endpoint[self.labelend[b]];
                b = self.inblossom[v];
                v = self.endpoint[self.labelend[b]];
            }
            if w != NONE {
                std::mem::swap(&mut v, &mut w);
            }
        }
        for b in path {
            self.label[b] = S;
        }
        base
    }

    /// Shrink the odd cycle closed by edge `k` into a new S-blossom.
    fn add_blossom(&mut self, base: usize, k: usize) {
        let (mut v, mut w, _) = self.edges[k];
        let bb = self.inblossom[base];
        let mut bv = self.inblossom[v];
        let mut bw = self.inblossom[w];
        let b = self
            .unusedblossoms
            .pop()
            .expect("at most n/2 blossoms exist at once");
        self.blossombase[b] = base;
        self.blossomparent[b] = NONE;
        self.blossomparent[bb] = b;

        let mut path = Vec::new();
        let mut endps = Vec::new();
        while bv != bb {
            self.blossomparent[bv] = b;
            path.push(bv);
            endps.push(self.labelend[bv]);
            v = self.endpoint[self.labelend[bv]];
            bv = self.inblossom[v];
        }
        path.push(bb);
        path.reverse();
        endps.reverse();
        endps.push(2 * k);
        while bw != bb {
            self.blossomparent[bw] = b;
            path.push(bw);
            endps.push(self.labelend[bw] ^ 1);
            w = self.endpoint[self.labelend[bw]];
            bw = self.inblossom[w];
        }
        self.blossomchilds[b] = path.clone();
        self.blossomendps[b] = endps;

        self.label[b] = S;
        self.labelend[b] = self.labelend[bb];
        self.dualvar[b] = 0;
        for leaf in self.blossom_leaves(b) {
            if self.label[self.inblossom[leaf]] == T {
                // T-vertices inside become S-vertices and must be scanned.
                self.queue.push(leaf);
            }
            self.inblossom[leaf] = b;
        }

        let mut bestedgeto = vec![NONE; 2 * self.n];
        for &child in &path {
            let nblists: Vec<Vec<usize>> = match self.blossombestedges[child].take() {
                Some(list) => vec![list],
                None => self
                    .blossom_leaves(child)
                    .into_iter()
                    .map(|leaf| self.neighbend[leaf].iter().map(|p| p / 2).collect())
                    .collect(),
            };
            for nblist in nblists {
                for k in nblist {
                    let (mut i, mut j, _) = self.edges[k];
                    if self.inblossom[j] == b {
                        std::mem::swap(&mut i, &mut j);
                    }
                    let bj = self.inblossom[j];
                    if bj != b
                        && self.label[bj] == S
                        && (bestedgeto[bj] == NONE || self.slack(k) < self.slack(bestedgeto[bj]))
                    {
                        bestedgeto[bj] = k;
                    }
                }
            }
            self.bestedge[child] = NONE;
        }
        let best: Vec<usize> = bestedgeto.into_iter().filter(|&k| k != NONE).collect();
        self.bestedge[b] = NONE;
        for &k in &best {
            if self.bestedge[b] == NONE || self.slack(k) < self.slack(self.bestedge[b]) {
                self.bestedge[b] = k;
            }
        }
        self.blossombestedges[b] = Some(best);
    }

    /// Turn the sub-blossoms of `b` back into top-level blossoms.
    fn expand_blossom(&mut self, b: usize, endstage: bool) {
        let children = self.blossomchilds[b].clone();
        for &s in &children {
            self.blossomparent[s] = NONE;
            if s < self.n {
                self.inblossom[s] = s;
            } else if endstage && self.dualvar[s] == 0 {
                self.expand_blossom(s, endstage);
            } else {
                for leaf in self.blossom_leaves(s) {
                    self.inblossom[leaf] = s;
                }
            }
        }

        if !endstage && self.label[b] == T {
            // Relabel the even-length path from the entry child to the base.
            let entrychild = self.inblossom[self.endpoint[self.labelend[b] ^ 1]];
            let mut j = children
                .iter()
                .position(|&c| c == entrychild)
                .expect("entry child belongs to the blossom") as isize;
            let (jstep, endptrick): (isize, usize) = if j & 1 != 0 {
                j -= children.len() as isize;
                (1, 0)
            } else {
                (-1, 1)
            };
            let mut p = self.labelend[b];
            while j != 0 {
                let entry = self.endpoint[p ^ 1];
                self.label[entry] = FREE;
                let e = self.endp_at(b, j - endptrick as isize);
                self.label[self.endpoint[e ^ endptrick ^ 1]] = FREE;
                self.assign_label(entry, T, p);
                self.allowedge[e / 2] = true;
                j += jstep;
                p = self.endp_at(b, j - endptrick as isize) ^ endptrick;
                self.allowedge[p / 2] = true;
                j += jstep;
            }
            let bv = self.child_at(b, j);
            let entry = self.endpoint[p ^ 1];
            self.label[entry] = T;
            self.label[bv] = T;
            self.labelend[entry] = p;
            self.labelend[bv] = p;
            self.bestedge[bv] = NONE;
            j += jstep;
            while self.child_at(b, j) != entrychild {
                let bv = self.child_at(b, j);
                if self.label[bv] == S {
                    j += jstep;
                    continue;
                }
                let reached = self
                    .blossom_leaves(bv)
                    .into_iter()
                    .find(|&leaf| self.label[leaf] != FREE);
                if let Some(leaf) = reached {
                    self.label[leaf] = FREE;
                    let base_mate = self.mate[self.blossombase[bv]];
                    self.label[self.endpoint[base_mate]] = FREE;
                    self.assign_label(leaf, T, self.labelend[leaf]);
                }
                j += jstep;
            }
        }

        self.label[b] = FREE;
        self.labelend[b] = NONE;
        self.blossomchilds[b].clear();
        self.blossomendps[b].clear();
        self.blossombase[b] = NONE;
        self.blossombestedges[b] = None;
        self.bestedge[b] = NONE;
        self.unusedblossoms.push(b);
    }

    /// Swap matched/unmatched edges along the path from `v` to the base of `b`.
    fn augment_blossom(&mut self, b: usize, v: usize) {
        let mut t = v;
        while self.blossomparent[t] != b {
            t = self.blossomparent[t];
        }
        if t >= self.n {
            self.augment_blossom(t, v);
        }
        let len = self.blossomchilds[b].len();
        let i = self.blossomchilds[b]
            .iter()
            .position(|&c| c == t)
            .expect("child belongs to the blossom");
        let mut j = i as isize;
        let (jstep, endptrick): (isize, usize) = if i & 1 != 0 {
            j -= len as isize;
            (1, 0)
        } else {
            (-1, 1)
        };
        while j != 0 {
            j += jstep;
            let t = self.child_at(b, j);
            let p = self.endp_at(b, j - endptrick as isize) ^ endptrick;
            if t >= self.n {
                self.augment_blossom(t, self.endpoint[p]);
            }
            j += jstep;
            let t = self.child_at(b, j);
            if t >= self.n {
                self.augment_blossom(t, self.endpoint[p ^ 1]);
            }
            self.mate[self.endpoint[p]] = p ^ 1;
            self.mate[self.endpoint[p ^ 1]] = p;
        }
        self.blossomchilds[b].rotate_left(i);
        self.blossomendps[b].rotate_left(i);
        self.blossombase[b] = self.blossombase[self.blossomchilds[b][0]];
    }

    /// Augment along the path through edge `k` between two S-vertices.
    fn augment_matching(&mut self, k: usize) {
        let (v, w, _) = self.edges[k];
        for (start, endp) in [(v, 2 * k + 1), (w, 2 * k)] {
            let (mut s, mut p) = (start, endp);
            loop {
                let bs = self.inblossom[s];
                if bs >= self.n {
                    self.augment_blossom(bs, s);
                }
                self.mate[s] = p;
                if self.labelend[bs] == NONE {
                    // Reached a single free vertex.
                    break;
                }
                let t = self.endpoint[self.labelend[bs]];
                let bt = self.inblossom[t];
                s = self.endpoint[self.labelend[bt]];
                let j = self.endpoint[self.labelend[bt] ^ 1];
                if bt >= self.n {
                    self.augment_blossom(bt, j);
                }
                self.mate[j] = self.labelend[bt];
                p = self.labelend[bt] ^ 1;
            }
        }
    }

    fn check_deadline(deadline: Option<Instant>) -> Result<(), DeadlineExceeded> {
        match deadline {
            Some(at) if Instant::now() >= at => Err(DeadlineExceeded),
            _ => Ok(()),
        }
    }

    fn solve(&mut self, max_cardinality: bool, deadline: Option<Instant>) -> Result<(), DeadlineExceeded> {
        let n = self.n;
        // Each stage either augments the matching or proves it maximum.
        for _ in 0..n {
            Self::check_deadline(deadline)?;
            self.label.fill(FREE);
            self.bestedge.fill(NONE);
            for b in n..2 * n {
                self.blossombestedges[b] = None;
            }
            self.allowedge.fill(false);
            self.queue.clear();
            for v in 0..n {
                if self.mate[v] == NONE && self.label[self.inblossom[v]] == FREE {
                    self.assign_label(v, S, NONE);
                }
            }

            let mut augmented = false;
            loop {
                Self::check_deadline(deadline)?;
                while !augmented {
                    let Some(v) = self.queue.pop() else {
                        break;
                    };
                    for idx in 0..self.neighbend[v].len() {
                        let p = self.neighbend[v][idx];
                        let k = p / 2;
                        let w = self.endpoint[p];
                        if self.inblossom[v] == self.inblossom[w] {
                            continue;
                        }
                        let mut kslack = 0;
                        if !self.allowedge[k] {
                            kslack = self.slack(k);
                            if kslack <= 0 {
                                self.allowedge[k] = true;
                            }
                        }
                        if self.allowedge[k] {
                            if self.label[self.inblossom[w]] == FREE {
                                self.assign_label(w, T, p ^ 1);
                            } else if self.label[self.inblossom[w]] == S {
                                let base = self.scan_blossom(v, w);
                                if base != NONE {
                                    self.add_blossom(base, k);
                                } else {
                                    self.augment_matching(k);
                                    augmented = true;
                                    break;
                                }
                            } else if self.label[w] == FREE {
                                self.label[w] = T;
                                self.labelend[w] = p ^ 1;
                            }
                        } else if self.label[self.inblossom[w]] == S {
                            let b = self.inblossom[v];
                            if self.bestedge[b] == NONE || kslack < self.slack(self.bestedge[b]) {
                                self.bestedge[b] = k;
                            }
                        } else if self.label[w] == FREE
                            && (self.bestedge[w] == NONE || kslack < self.slack(self.bestedge[w]))
                        {
                            self.bestedge[w] = k;
                        }
                    }
                }
                if augmented {
                    break;
                }

                // No augmenting path with the current tight edges: adjust duals.
                let mut deltatype = 0u8;
                let mut delta = 0i64;
                let mut deltaedge = NONE;
                let mut deltablossom = NONE;
                let min_vertex_dual = self.dualvar[..n].iter().copied().min().unwrap_or(0);
                if !max_cardinality {
                    deltatype = 1;
                    delta = min_vertex_dual;
                }
                for v in 0..n {
                    if self.label[self.inblossom[v]] == FREE && self.bestedge[v] != NONE {
                        let d = self.slack(self.bestedge[v]);
                        if deltatype == 0 || d < delta {
                            delta = d;
                            deltatype = 2;
                            deltaedge = self.bestedge[v];
                        }
                    }
                }
                for b in 0..2 * n {
                    if self.blossomparent[b] == NONE && self.label[b] == S && self.bestedge[b] != NONE {
                        let d = self.slack(self.bestedge[b]) / 2;
                        if deltatype == 0 || d < delta {
                            delta = d;
                            deltatype = 3;
                            deltaedge = self.bestedge[b];
                        }
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE
                        && self.blossomparent[b] == NONE
                        && self.label[b] == T
                        && (deltatype == 0 || self.dualvar[b] < delta)
                    {
                        delta = self.dualvar[b];
                        deltatype = 4;
                        deltablossom = b;
                    }
                }
                if deltatype == 0 {
                    // Maximum cardinality reached; finish with the optimum duals.
                    deltatype = 1;
                    delta = min_vertex_dual.max(0);
                }

                for v in 0..n {
                    match self.label[self.inblossom[v]] {
                        S => self.dualvar[v] -= delta,
                        T => self.dualvar[v] += delta,
                        _ => {}
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE && self.blossomparent[b] == NONE {
                        match self.label[b] {
                            S => self.dualvar[b] += delta,
                            T => self.dualvar[b] -= delta,
                            _ => {}
                        }
                    }
                }

                match deltatype {
                    1 => break,
                    2 => {
                        self.allowedge[deltaedge] = true;
                        let (mut i, mut j, _) = self.edges[deltaedge];
                        if self.label[self.inblossom[i]] == FREE {
                            std::mem::swap(&mut i, &mut j);
                        }
                        self.queue.push(i);
                    }
                    3 => {
                        self.allowedge[deltaedge] = true;
                        let (i, _, _) = self.edges[deltaedge];
                        self.queue.push(i);
                    }
                    _ => self.expand_blossom(deltablossom, false),
                }
            }

            if !augmented {
                break;
            }
            for b in n..2 * n {
                if self.blossomparent[b] == NONE
                    && self.blossombase[b] != NONE
                    && self.label[b] == S
                    && self.dualvar[b] == 0
                {
                    self.expand_blossom(b, true);
                }
            }
        }
        Ok(())
    }
}
