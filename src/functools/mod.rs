// Copyright (C) 2025 Nuwaira
// All Rights Reserved.
//
// NOTICE: All information contained herein is, and remains
// the property of Nuwaira.
// The intellectual and technical concepts contained
// herein are proprietary to Nuwaira
// and are protected by trade secret or copyright law.
// Dissemination of this information or reproduction of this material
// is strictly forbidden unless prior written permission is obtained
// from Nuwaira.

mod describe_table;
mod list_tables;
mod run_query;

pub use describe_table::{describe_table, ColumnInfo, TableDescription};
pub use list_tables::list_tables;
pub use run_query::{query, run_query, OutputFormat};
