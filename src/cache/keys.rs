use crate::provider::FetchLevel;

pub fn sprint(sprint_id: u64) -> String {
    format!("sprint:{sprint_id}")
}

pub fn sprint_issues(sprint_id: u64, level: FetchLevel) -> String {
    format!("sprint:{sprint_id}:issues:{level}")
}

pub fn closed_sprints(board_id: u64) -> String {
    format!("board:{board_id}:closed-sprints")
}
