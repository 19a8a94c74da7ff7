// Per-row style columns for charts that bake styles into the data

use super::PreprocessedGroup;
use crate::args::CallArgs;
use crate::data::{Column, GroupKey, Table};
use crate::error::Result;
use crate::resolve::AttachedStyle;

/// Materializes per-row style columns for charts that cannot be split by group.
#[derive(Debug)]
pub struct AttachedPreprocesser {
    styles: Vec<AttachedStyle>,
}

impl AttachedPreprocesser {
    pub fn new(styles: Vec<AttachedStyle>) -> Self {
        Self { styles }
    }

    pub fn preprocess(&mut self, mut table: Table) -> Result<PreprocessedGroup> {
        let mut remap = CallArgs::new();
        for style in self.styles.iter_mut() {
            let sources = style
                .columns
                .iter()
                .map(|c| table.column(c).map(|col| col.values.clone()))
                .collect::<Result<Vec<_>>>()?;
            let values = (0..table.num_rows())
                .map(|row| {
                    let key = GroupKey(sources.iter().map(|s| s[row].clone()).collect());
                    style.manager.assign(&key)
                })
                .collect();
            table = table.with_column(Column::new(style.target.clone(), values))?;
            remap.set(style.attr.attached_arg(), style.target.as_str());
        }
        Ok(PreprocessedGroup { table, remap })
    }
}
