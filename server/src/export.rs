//! CSV rendering for `GET /api/export/csv`.

use crate::models::TodoSummary;

pub const CSV_HEADER: [&str; 7] = ["ID", "Task", "Completed", "Category", "Priority", "Created At", "Due Date"];

/// Renders todos as CSV bytes, one row per todo after the header row.
pub fn todos_to_csv(todos: &[TodoSummary]) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;

    for summary in todos {
        let todo = &summary.todo;
        wtr.write_record([
            todo.id.to_string(),
            todo.text.clone(),
            if todo.completed { "Yes".to_owned() } else { "No".to_owned() },
            summary.category_name.clone().unwrap_or_default(),
            todo.priority.get().to_string(),
            todo.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            todo.due_date.map(|d| d.to_string()).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}
