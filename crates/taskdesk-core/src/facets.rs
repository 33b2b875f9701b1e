use std::collections::HashSet;

use taskdesk_shared::TaskDto;

/// Distinct non-empty owners of `tasks` in first-seen order.
pub fn unique_creators(tasks: &[TaskDto]) -> Vec<String> {
    let mut seen = HashSet::new();
    tasks
        .iter()
        .filter_map(|task| task.created_by.as_deref())
        .filter(|owner| !owner.is_empty())
        .filter(|owner| seen.insert(*owner))
        .map(str::to_string)
        .collect()
}

/// Rows of the fetched page owned by `owner`, or the whole page without one.
pub fn filter_by_creator<'a>(tasks: &'a [TaskDto], owner: Option<&str>) -> Vec<&'a TaskDto> {
    match owner {
        Some(owner) => tasks
            .iter()
            .filter(|task| task.created_by.as_deref() == Some(owner))
            .collect(),
        None => tasks.iter().collect(),
    }
}
