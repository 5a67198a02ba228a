use std::collections::VecDeque;

use crate::models::application::ApplicationStatus;

/// Allowed next statuses, indexed by the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    edges: [&'static [ApplicationStatus]; 8],
}

impl TransitionTable {
    pub fn standard() -> Self {
        use ApplicationStatus::*;

        Self {
            edges: [
                /* submitted */ &[UnderReview, Rejected, Withdrawn],
                /* under_review */ &[InterviewScheduled, Rejected, Withdrawn],
                /* interview_scheduled */ &[InterviewCompleted, Rejected, Withdrawn],
                /* interview_completed */ &[OfferMade, Rejected, Withdrawn],
                /* offer_made */ &[Accepted, Rejected, Withdrawn],
                /* accepted */ &[Withdrawn],
                /* rejected */ &[],
                /* withdrawn */ &[],
            ],
        }
    }

    pub fn allowed_from(&self, current: ApplicationStatus) -> &'static [ApplicationStatus] {
        self.edges[index(current)]
    }

    pub fn allows(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        self.allowed_from(from).contains(&to)
    }

    pub fn is_terminal(&self, status: ApplicationStatus) -> bool {
        self.allowed_from(status).is_empty()
    }

    /// Shortest chain of edges leading from `from` to `to`, excluding `from`
    /// itself. Only passes through statuses on the forward hiring path, so a
    /// cascade never detours through `rejected` or `withdrawn`.
    pub fn forward_path(
        &self,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Option<Vec<ApplicationStatus>> {
        if from == to {
            return Some(Vec::new());
        }
        let mut previous: [Option<ApplicationStatus>; 8] = [None; 8];
        let mut seen = [false; 8];
        let mut queue = VecDeque::from([from]);
        seen[index(from)] = true;

        while let Some(current) = queue.pop_front() {
            for &next in self.allowed_from(current) {
                if seen[index(next)] || next.stage().is_none() {
                    continue;
                }
                seen[index(next)] = true;
                previous[index(next)] = Some(current);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(prev) = previous[index(cursor)] {
                        if prev == from {
                            break;
                        }
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Checks that `statuses`, read oldest first, only ever follows edges of
    /// this table. Returns the first offending pair otherwise.
    pub fn check_walk(
        &self,
        statuses: &[ApplicationStatus],
    ) -> Result<(), (ApplicationStatus, ApplicationStatus)> {
        for pair in statuses.windows(2) {
            if !self.allows(pair[0], pair[1]) {
                return Err((pair[0], pair[1]));
            }
        }
        Ok(())
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn index(status: ApplicationStatus) -> usize {
    match status {
        ApplicationStatus::Submitted => 0,
        ApplicationStatus::UnderReview => 1,
        ApplicationStatus::InterviewScheduled => 2,
        ApplicationStatus::InterviewCompleted => 3,
        ApplicationStatus::OfferMade => 4,
        ApplicationStatus::Accepted => 5,
        ApplicationStatus::Rejected => 6,
        ApplicationStatus::Withdrawn => 7,
    }
}
