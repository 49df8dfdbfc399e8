/// A named task category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct List {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Medium,
    Low,
    None,
}

impl Priority {
    pub fn from_code(code: &str) -> Priority {
        match code {
            "1" => Priority::High,
            "2" => Priority::Medium,
            "3" => Priority::Low,
            _ => Priority::None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Priority::High => "1",
            Priority::Medium => "2",
            Priority::Low => "3",
            Priority::None => "N",
        }
    }
}

/// A task as stored in the cache. `(list_id, task_series_id, task_id)` is its identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub list_id: String,
    pub task_series_id: String,
    pub task_id: String,
    pub name: String,
    pub due: String,
    pub priority: Priority,
    pub completed: String,
}

/// A cached task joined with the name of its list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskRecord {
    pub list_id: String,
    pub task_series_id: String,
    pub task_id: String,
    pub name: String,
    pub due: String,
    pub priority: String,
    pub completed: String,
    pub list_name: String,
}

impl TaskRecord {
    pub fn is_completed(&self) -> bool {
        !self.completed.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRow {
    pub uri: String,
    pub icon: String,
    pub category: String,
    pub mime_type: String,
    pub subtitle: String,
    pub title: String,
    pub comment: String,
}

/// Receives the rows produced by a search.
pub trait ResultSink {
    fn append(&mut self, row: ResultRow);
    fn clear(&mut self);
}

impl ResultSink for Vec<ResultRow> {
    fn append(&mut self, row: ResultRow) {
        self.push(row);
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_codes_map_both_ways() {
        for code in ["1", "2", "3", "N"] {
            assert_eq!(Priority::from_code(code).code(), code);
        }
        assert_eq!(Priority::from_code(""), Priority::None);
    }

    #[test]
    fn priority_orders_high_first() {
        let mut values = vec![Priority::None, Priority::Low, Priority::High, Priority::Medium];
        values.sort();
        assert_eq!(
            values,
            vec![Priority::High, Priority::Medium, Priority::Low, Priority::None]
        );
    }
}
