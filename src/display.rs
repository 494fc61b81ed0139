use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use crate::table::Table;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DisplayStyle {
    Table,
    Json,
}

pub trait TerminalDisplay {
    fn table_titles() -> Vec<&'static str>;
    fn table_row(self) -> Vec<String>;
}

pub fn display_json<T: Serialize>(o: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&o)?);
    Ok(())
}

pub fn display_list<T: Serialize + TerminalDisplay>(list: Vec<T>, style: DisplayStyle) -> Result<()> {
    match style {
        DisplayStyle::Table => {
            if list.is_empty() {
                println!("<empty list>");
                return Ok(());
            }
            let mut table = Table::with_capacity(list.len() + 1);
            let titles = T::table_titles();
            table.add(titles.iter().map(|s| s.to_string()).collect());

            for item in list {
                table.add(item.table_row());
            }

            table.show();
        }
        DisplayStyle::Json => display_json(&list)?,
    }
    Ok(())
}
