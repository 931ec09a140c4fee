pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_users.sql")),
				"tables/002_workspaces.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_workspaces.sql")),
				"tables/003_workspace_members.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_workspace_members.sql")),
				"tables/004_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_documents.sql")),
				"tables/005_memory_items.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_memory_items.sql")),
				"tables/006_activities.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_activities.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
