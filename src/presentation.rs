use crate::due_date::DueDateFormatter;
use crate::models::{Priority, TaskRecord};
use std::cmp::Ordering;

/// Labels keyed by raw priority code. `0` doubles as the fallback.
const PRIORITY_LABELS: [(&str, &str); 5] = [
    ("0", "Oops, error!"),
    ("1", "High Priority"),
    ("2", "Medium Priority"),
    ("3", "Low Priority"),
    ("N", "Unspecified"),
];

pub fn priority_label(code: &str) -> &'static str {
    PRIORITY_LABELS
        .iter()
        .find(|(key, _)| *key == code)
        .or_else(|| PRIORITY_LABELS.first())
        .map(|(_, label)| *label)
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderKey {
    Priority,
    Due,
    Name,
}

impl OrderKey {
    pub fn parse(value: &str) -> Option<OrderKey> {
        match value.trim().to_lowercase().as_str() {
            "priority" => Some(OrderKey::Priority),
            "due" => Some(OrderKey::Due),
            "name" | "names" => Some(OrderKey::Name),
            _ => None,
        }
    }
}

/// What the result list shows for one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub list_id: String,
    pub task_series_id: String,
    pub task_id: String,
    pub category: String,
    pub name: String,
    pub due: String,
    pub pretty_due: String,
    pub priority: String,
    pub completed: String,
}

impl TaskDescriptor {
    pub fn from_record(record: &TaskRecord, formatter: &DueDateFormatter) -> Self {
        Self {
            list_id: record.list_id.clone(),
            task_series_id: record.task_series_id.clone(),
            task_id: record.task_id.clone(),
            category: record.list_name.clone(),
            name: record.name.clone(),
            due: record.due.clone(),
            pretty_due: formatter.format_or_raw(&record.due),
            priority: record.priority.clone(),
            completed: record.completed.clone(),
        }
    }
}

fn due_cmp(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

/// Stable in-place sort. Unrecognized keys leave the order untouched.
pub fn order_by(tasks: &mut [TaskDescriptor], key: &str) {
    let Some(key) = OrderKey::parse(key) else {
        return;
    };
    match key {
        OrderKey::Priority => tasks.sort_by(|a, b| {
            Priority::from_code(&a.priority)
                .cmp(&Priority::from_code(&b.priority))
                .then_with(|| due_cmp(&a.due, &b.due))
        }),
        OrderKey::Due => tasks.sort_by(|a, b| due_cmp(&a.due, &b.due)),
        OrderKey::Name => tasks.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}

pub fn build_preview_text(record: &TaskRecord, formatter: &DueDateFormatter) -> String {
    let due = if record.due.is_empty() {
        "No due date".to_string()
    } else {
        formatter.format_or_raw(&record.due)
    };

    let mut text = format!("<b>Category</b>: {}\n", record.list_name);
    text.push_str(&format!(
        "<b>Priority</b>: {}\n",
        priority_label(&record.priority)
    ));
    text.push_str(&format!("<b>Due date</b>: {due}\n"));
    if record.is_completed() {
        text.push_str(&format!(
            "<b>Completed</b>: {}\n",
            formatter.format_or_raw(&record.completed)
        ));
    }
    text.push_str("\n<b>Description</b>\n");
    text.push_str(&format!("<i>{}</i>", record.name));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, priority: &str, due: &str) -> TaskDescriptor {
        TaskDescriptor {
            list_id: "1".to_string(),
            task_series_id: format!("s-{name}"),
            task_id: format!("t-{name}"),
            category: "Work".to_string(),
            name: name.to_string(),
            due: due.to_string(),
            pretty_due: String::new(),
            priority: priority.to_string(),
            completed: String::new(),
        }
    }

    fn names(tasks: &[TaskDescriptor]) -> Vec<&str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn priority_puts_high_first() {
        let mut tasks = vec![
            descriptor("low", "3", ""),
            descriptor("high", "1", "2020-01-01T00:00:00Z"),
        ];
        order_by(&mut tasks, "priority");
        assert_eq!(names(&tasks), vec!["high", "low"]);
    }

    #[test]
    fn due_puts_dated_tasks_first() {
        let mut tasks = vec![
            descriptor("undated", "3", ""),
            descriptor("dated", "1", "2020-01-01T00:00:00Z"),
        ];
        order_by(&mut tasks, "due");
        assert_eq!(names(&tasks), vec!["dated", "undated"]);
    }

    #[test]
    fn priority_ties_break_on_due_with_undated_last() {
        let mut tasks = vec![
            descriptor("none", "N", ""),
            descriptor("b-undated", "2", ""),
            descriptor("b-late", "2", "2021-06-01T00:00:00Z"),
            descriptor("b-early", "2", "2020-06-01T00:00:00Z"),
            descriptor("a", "1", ""),
        ];
        order_by(&mut tasks, "priority");
        assert_eq!(
            names(&tasks),
            vec!["a", "b-early", "b-late", "b-undated", "none"]
        );
    }

    #[test]
    fn name_orders_lexicographically() {
        let mut tasks = vec![
            descriptor("pay rent", "1", ""),
            descriptor("buy milk", "N", ""),
            descriptor("call mum", "2", ""),
        ];
        order_by(&mut tasks, "name");
        assert_eq!(names(&tasks), vec!["buy milk", "call mum", "pay rent"]);
    }

    #[test]
    fn unknown_key_is_a_no_op() {
        let mut tasks = vec![
            descriptor("z", "N", ""),
            descriptor("a", "1", "2020-01-01T00:00:00Z"),
        ];
        order_by(&mut tasks, "Unspecified");
        assert_eq!(names(&tasks), vec!["z", "a"]);
    }

    #[test]
    fn labels_cover_every_code() {
        assert_eq!(priority_label("1"), "High Priority");
        assert_eq!(priority_label("2"), "Medium Priority");
        assert_eq!(priority_label("3"), "Low Priority");
        assert_eq!(priority_label("N"), "Unspecified");
        assert_eq!(priority_label("0"), "Oops, error!");
        assert_eq!(priority_label("7"), "Oops, error!");
    }

    fn record(due: &str, completed: &str) -> TaskRecord {
        TaskRecord {
            list_id: "1".to_string(),
            task_series_id: "s1".to_string(),
            task_id: "t1".to_string(),
            name: "Write report".to_string(),
            due: due.to_string(),
            priority: "2".to_string(),
            completed: completed.to_string(),
            list_name: "Work".to_string(),
        }
    }

    #[test]
    fn preview_lists_fields_in_order() {
        let text = build_preview_text(
            &record("2012-03-29T22:00:00Z", ""),
            &DueDateFormatter::utc(),
        );
        assert_eq!(
            text,
            "<b>Category</b>: Work\n\
             <b>Priority</b>: Medium Priority\n\
             <b>Due date</b>: Thu 29 Mar 2012 10:00PM\n\
             \n<b>Description</b>\n\
             <i>Write report</i>"
        );
    }

    #[test]
    fn preview_mentions_completion_and_missing_due() {
        let text = build_preview_text(
            &record("", "2012-11-07T11:09:00Z"),
            &DueDateFormatter::utc(),
        );
        assert!(text.contains("<b>Due date</b>: No due date\n"));
        assert!(text.contains("<b>Completed</b>: Wed 07 Nov 2012 11:09AM\n"));
        let completed_at = text.find("Completed").expect("completed line");
        let description_at = text.find("Description").expect("description line");
        assert!(completed_at < description_at);
    }

    #[test]
    fn descriptor_carries_pretty_due() {
        let descriptor =
            TaskDescriptor::from_record(&record("2012-03-29T22:00:00Z", ""), &DueDateFormatter::utc());
        assert_eq!(descriptor.category, "Work");
        assert_eq!(descriptor.pretty_due, "Thu 29 Mar 2012 10:00PM");
    }
}
