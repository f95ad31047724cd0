//! Memoised recursive search for the shortest relocation chain which makes
//! room for a tenant on a target host.

use std::collections::HashMap;

use crate::common::{HostId, Move, TenantId};
use crate::config::MaintainerConfig;
use crate::error::CapacityError;
use crate::host_capacity::HostCapacity;
use crate::resources::Resources;
use crate::subsets::SubsetEnumerator;

/// Identity of a subproblem: structural over the tenant, the target host and
/// both order-sensitive move sequences.
#[derive(Clone, PartialEq, Eq, Hash)]
struct SolutionKey {
    tenant: TenantId,
    target: HostId,
    moves_considered: Vec<Move>,
    moves_made: Vec<Move>,
}

/// Searches for the shortest sequence of tenant relocations which frees
/// enough capacity on a chosen host.
///
/// A solver value is scoped to a single top-level [`make_room_for`](CapacitySolver::make_room_for)
/// query: both the memo table and the iteration budget are discarded with it.
pub struct CapacitySolver<'a> {
    capacity: &'a HostCapacity<'a>,
    max_iterations: u32,
    max_eviction_subset_size: usize,
    max_considered_nodes: usize,
    iterations: u32,
    budget_exhausted: bool,
    /// Subproblem solutions already found. `None` is a valid cached answer.
    solutions: HashMap<SolutionKey, Option<Vec<Move>>>,
}

impl<'a> CapacitySolver<'a> {
    pub fn new(capacity: &'a HostCapacity<'a>, config: &MaintainerConfig) -> Self {
        Self {
            capacity,
            max_iterations: config.max_iterations,
            max_eviction_subset_size: config.max_eviction_subset_size,
            max_considered_nodes: config.max_considered_nodes,
            iterations: 0,
            budget_exhausted: false,
            solutions: HashMap::new(),
        }
    }

    /// Finds the shortest sequence of moves which makes room for the given
    /// tenant on the given host, assuming the given moves already made over
    /// the hosts' current allocation.
    ///
    /// Each move relocates a tenant currently placed on some host in `hosts`
    /// to another host in `hosts`, never back onto `target`, and never
    /// involves a tenant already moved in `moves_considered` or `moves_made`.
    ///
    /// Returns `moves_made` with the moves needed for this appended, in the
    /// order they should be performed, or `None` when no sequence could be
    /// found within the iteration budget.
    pub fn make_room_for(
        &mut self,
        tenant: TenantId,
        target: HostId,
        hosts: &[HostId],
        moves_considered: &[Move],
        moves_made: &[Move],
    ) -> Result<Option<Vec<Move>>, CapacityError> {
        let key = SolutionKey {
            tenant,
            target,
            moves_considered: moves_considered.to_vec(),
            moves_made: moves_made.to_vec(),
        };
        if let Some(solution) = self.solutions.get(&key) {
            return Ok(solution.clone());
        }
        let solution = self.find_room_for(tenant, target, hosts, moves_considered, moves_made)?;
        // an answer cut short by the budget is not a real answer
        if !self.budget_exhausted {
            self.solutions.insert(key, solution.clone());
        }
        Ok(solution)
    }

    /// The number of recursive search entries performed so far.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn find_room_for(
        &mut self,
        tenant: TenantId,
        target: HostId,
        hosts: &[HostId],
        moves_considered: &[Move],
        moves_made: &[Move],
    ) -> Result<Option<Vec<Move>>, CapacityError> {
        self.iterations += 1;
        if self.iterations > self.max_iterations {
            self.budget_exhausted = true;
            return Ok(None);
        }

        let snapshot = self.capacity.snapshot();
        let required = *snapshot.tenant(tenant).resources();
        // no amount of eviction helps a host which can never fit the tenant
        if !snapshot.host(target).resources().satisfies(&required) {
            return Ok(None);
        }
        let free = self.free_capacity_with(moves_made, target)?;
        if free.satisfies(&required) {
            return Ok(Some(Vec::new()));
        }

        let mut shortest: Option<Vec<Move>> = None;
        let children = self.capacity.children_of(target);
        let considered = &children[..children.len().min(self.max_considered_nodes)];
        for subset in SubsetEnumerator::new(considered, self.max_eviction_subset_size) {
            let mut reclaimed = free;
            for &child in &subset {
                reclaimed = reclaimed.add(snapshot.tenant(child).resources())?;
            }
            if !reclaimed.satisfies(&required) {
                continue;
            }
            let moves = self.move_all(&subset, target, hosts, moves_considered, moves_made)?;
            let Some(moves) = moves else { continue };
            if shortest.as_ref().map_or(true, |s| moves.len() < s.len()) {
                shortest = Some(moves);
            }
        }
        match shortest {
            Some(moves) => {
                let mut solution = moves_made.to_vec();
                solution.extend(moves);
                Ok(Some(solution))
            }
            None => Ok(None),
        }
    }

    /// Moves every tenant of the set off the given host, threading the moves
    /// accumulated so far. Fails when any one of them cannot be placed.
    fn move_all(
        &mut self,
        tenants: &[TenantId],
        host: HostId,
        hosts: &[HostId],
        moves_considered: &[Move],
        moves_made: &[Move],
    ) -> Result<Option<Vec<Move>>, CapacityError> {
        let mut moves: Vec<Move> = Vec::new();
        for &tenant in tenants {
            let mut made = moves_made.to_vec();
            made.extend_from_slice(&moves);
            let child_moves = self.move_one(tenant, host, hosts, moves_considered, &made)?;
            match child_moves {
                Some(child_moves) => moves.extend(child_moves),
                None => return Ok(None),
            }
        }
        Ok(Some(moves))
    }

    /// Finds the cheapest placement of a single tenant onto some host other
    /// than the one it leaves. Returns the new moves only, target move last.
    fn move_one(
        &mut self,
        tenant: TenantId,
        host: HostId,
        hosts: &[HostId],
        moves_considered: &[Move],
        moves_made: &[Move],
    ) -> Result<Option<Vec<Move>>, CapacityError> {
        // a tenant moves at most once per scenario
        if Self::contains(tenant, moves_considered) || Self::contains(tenant, moves_made) {
            return Ok(None);
        }
        let mut shortest: Option<Vec<Move>> = None;
        for &target in hosts {
            if target == host {
                continue;
            }
            let mv = Move::new(tenant, host, target);
            let mut considered = moves_considered.to_vec();
            considered.push(mv);
            let chain = self.make_room_for(tenant, target, hosts, &considered, moves_made)?;
            let Some(chain) = chain else { continue };
            // the chain repeats moves_made as a prefix (or is empty on a
            // direct fit); only the moves beyond it belong to this candidate
            let mut candidate = Self::moves_beyond(&chain, moves_made.len()).to_vec();
            candidate.push(mv);
            if shortest.as_ref().map_or(true, |s| s.len() > candidate.len()) {
                shortest = Some(candidate);
            }
        }
        Ok(shortest)
    }

    fn contains(tenant: TenantId, moves: &[Move]) -> bool {
        moves.iter().any(|mv| mv.tenant == tenant)
    }

    fn moves_beyond(chain: &[Move], prefix_len: usize) -> &[Move] {
        if chain.len() <= prefix_len {
            &[]
        } else {
            &chain[prefix_len..]
        }
    }

    /// Free capacity of the host adjusted for the given moves: departures
    /// give their resources back, arrivals take theirs away.
    fn free_capacity_with(&self, moves: &[Move], host: HostId) -> Result<Resources, CapacityError> {
        let snapshot = self.capacity.snapshot();
        let mut free = self.capacity.free_capacity_of(host)?;
        for mv in moves {
            if mv.from == host {
                free = free.add(snapshot.tenant(mv.tenant).resources())?;
            }
        }
        for mv in moves {
            if mv.to == host {
                free = free.subtract(snapshot.tenant(mv.tenant).resources())?;
            }
        }
        Ok(free)
    }
}
