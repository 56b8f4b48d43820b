//! Category and tag display formatting

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::models::{Category, Tag};

/// Format categories as a table
pub fn format_category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Name", "Color", "Icon"]);
    for category in categories {
        builder.push_record([
            category.id.to_string(),
            category.name.clone(),
            category.color.clone(),
            category.icon_name.clone(),
        ]);
    }

    builder.build().with(Style::psql()).to_string()
}

/// Format category details
pub fn format_category_details(category: &Category) -> String {
    let mut output = String::new();

    output.push_str(&format!("Category: {}\n", category.name));
    output.push_str(&format!("  ID:    {}\n", category.id));
    output.push_str(&format!("  Color: {}\n", category.color));
    output.push_str(&format!("  Icon:  {}\n", category.icon_name));
    if category.is_default() {
        output.push_str("  (reserved)\n");
    }

    output.push('\n');
    output.push_str(&format!(
        "  Created:  {}\n",
        category.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "  Modified: {}\n",
        category.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

/// Format tags as a table
pub fn format_tag_list(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "No tags found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Tag"]);
    for tag in tags {
        builder.push_record([tag.id.to_string(), tag.to_string()]);
    }

    builder.build().with(Style::psql()).to_string()
}
