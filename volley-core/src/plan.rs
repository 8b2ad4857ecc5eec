use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// User tiers, cycle sizes and agent count for one run.
///
/// Tiers run one after another; every virtual user of a tier walks through all cycle sizes in
/// order. With agents, each agent executes the whole plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadPlan {
    users: Vec<u64>,
    cycles: Vec<u64>,
    agents: Option<u64>,
}

/// The flattened result of [`compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub expected_total: u64,
    pub cycles: Vec<u64>,
    pub users: Vec<u64>,
    pub agents: Option<u64>,
}

pub fn compute(users: &str, cycles: &str, agents: Option<u64>) -> Result<Workload> {
    let plan = WorkloadPlan::parse(users, cycles, agents)?;
    let expected_total = plan.expected_total()?;
    Ok(Workload {
        expected_total,
        cycles: plan.cycles,
        users: plan.users,
        agents: plan.agents,
    })
}

impl WorkloadPlan {
    pub fn new(users: Vec<u64>, cycles: Vec<u64>, agents: Option<u64>) -> Result<Self> {
        if users.is_empty() || users.contains(&0) {
            return Err(Error::InvalidUsers(join_tiers(&users)));
        }
        if cycles.is_empty() || cycles.contains(&0) {
            return Err(Error::InvalidCycles(join_tiers(&cycles)));
        }
        if agents == Some(0) {
            return Err(Error::InvalidAgents);
        }

        let plan = Self {
            users,
            cycles,
            agents,
        };
        // Reject plans whose total cannot be represented up front.
        plan.expected_total()?;
        Ok(plan)
    }

    pub fn parse(users: &str, cycles: &str, agents: Option<u64>) -> Result<Self> {
        let users = parse_tiers(users).ok_or_else(|| Error::InvalidUsers(users.to_string()))?;
        let cycles = parse_tiers(cycles).ok_or_else(|| Error::InvalidCycles(cycles.to_string()))?;
        Self::new(users, cycles, agents)
    }

    pub fn users(&self) -> &[u64] {
        &self.users
    }

    pub fn cycles(&self) -> &[u64] {
        &self.cycles
    }

    pub fn agents(&self) -> Option<u64> {
        self.agents
    }

    /// Scenario invocations a single process performs for this plan.
    pub fn invocations_per_agent(&self) -> Result<u64> {
        let per_user = self
            .cycles
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(*c))
            .ok_or(Error::PlanOverflow)?;

        self.users
            .iter()
            .try_fold(0u64, |acc, u| {
                u.checked_mul(per_user).and_then(|n| acc.checked_add(n))
            })
            .ok_or(Error::PlanOverflow)
    }

    pub fn expected_total(&self) -> Result<u64> {
        self.invocations_per_agent()?
            .checked_mul(self.agents.unwrap_or(1))
            .ok_or(Error::PlanOverflow)
    }

    /// The same plan as executed by one agent.
    pub fn for_single_agent(&self) -> Self {
        Self {
            users: self.users.clone(),
            cycles: self.cycles.clone(),
            agents: None,
        }
    }

    pub fn users_spec(&self) -> String {
        join_tiers(&self.users)
    }

    pub fn cycles_spec(&self) -> String {
        join_tiers(&self.cycles)
    }
}

fn parse_tiers(spec: &str) -> Option<Vec<u64>> {
    spec.split(':')
        .map(|part| match part.trim().parse::<u64>() {
            Ok(v) if v >= 1 => Some(v),
            _ => None,
        })
        .collect()
}

fn join_tiers(values: &[u64]) -> String {
    values
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(users: &str, cycles: &str, agents: Option<u64>) -> WorkloadPlan {
        WorkloadPlan::parse(users, cycles, agents)
            .unwrap_or_else(|err| panic!("expected a valid plan: {err}"))
    }

    fn total(p: &WorkloadPlan) -> u64 {
        p.expected_total()
            .unwrap_or_else(|err| panic!("expected a countable plan: {err}"))
    }

    #[test]
    fn expected_total_sums_users_times_cycles() {
        assert_eq!(total(&plan("1", "1", None)), 1);
        assert_eq!(total(&plan("2", "3", None)), 6);
        // 10 * (5 + 10) + 20 * (5 + 10)
        assert_eq!(total(&plan("10:20", "5:10", None)), 450);
    }

    #[test]
    fn agents_multiply_the_total() {
        assert_eq!(total(&plan("2", "3", Some(4))), 24);
        assert_eq!(total(&plan("1:2", "3", Some(1))), 9);
    }

    #[test]
    fn tier_order_is_preserved() {
        let p = plan("20:5:10", "3:1", None);
        assert_eq!(p.users(), &[20, 5, 10]);
        assert_eq!(p.cycles(), &[3, 1]);
        assert_eq!(p.users_spec(), "20:5:10");
    }

    #[test]
    fn rejects_non_positive_and_malformed_values() {
        assert!(matches!(
            WorkloadPlan::parse("0", "1", None),
            Err(Error::InvalidUsers(_))
        ));
        assert!(matches!(
            WorkloadPlan::parse("1", "2::3", None),
            Err(Error::InvalidCycles(_))
        ));
        assert!(matches!(
            WorkloadPlan::parse("-1", "1", None),
            Err(Error::InvalidUsers(_))
        ));
        assert!(matches!(
            WorkloadPlan::parse("1", "x", None),
            Err(Error::InvalidCycles(_))
        ));
        assert!(matches!(
            WorkloadPlan::parse("1", "1", Some(0)),
            Err(Error::InvalidAgents)
        ));
        assert!(matches!(
            WorkloadPlan::new(Vec::new(), vec![1], None),
            Err(Error::InvalidUsers(_))
        ));
    }

    #[test]
    fn overflowing_plans_are_rejected() {
        assert!(matches!(
            WorkloadPlan::new(vec![u64::MAX], vec![2], None),
            Err(Error::PlanOverflow)
        ));
    }

    #[test]
    fn compute_flattens_the_plan() {
        let w = compute("1:2", "3", Some(2)).unwrap_or_else(|err| panic!("compute failed: {err}"));
        assert_eq!(
            w,
            Workload {
                expected_total: 18,
                cycles: vec![3],
                users: vec![1, 2],
                agents: Some(2),
            }
        );
    }
}
