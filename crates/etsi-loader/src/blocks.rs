//! ETSI Loader Block Partitioner
//!
//! Splits the data rows of a dataset into INSERT blocks. Multi-device
//! datasets get one block per device sized by the sidecar `time`
//! dimension; single-device datasets use a size chosen from the
//! measurement count.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use etsi_schema::DatasetSchema;
use std::ops::Range;
use tracing::warn;

/// One INSERT block: a range of data rows written under one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    pub device: String,
    pub rows: Range<usize>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows per block for single-device datasets.
pub fn single_device_block_size(measurements: usize) -> usize {
    if measurements < 256 {
        131_072
    } else if measurements < 512 {
        32_768
    } else {
        8_192
    }
}

/// Partition `row_count` data rows into blocks.
pub fn plan_blocks(schema: &DatasetSchema, row_count: usize) -> Vec<Block> {
    if schema.is_multi_device() {
        let devices = &schema.devices;
        let block_size = match schema.dimension("time") {
            Some(size) if size > 0 => size,
            _ => {
                let size = row_count.div_ceil(devices.len()).max(1);
                warn!(
                    "No 'time' dimension for {}, splitting {} rows evenly ({} per device)",
                    schema.identifier, row_count, size
                );
                size
            }
        };

        devices
            .iter()
            .enumerate()
            .map(|(k, device)| Block {
                index: k,
                device: device.clone(),
                rows: clip(k * block_size, (k + 1) * block_size, row_count),
            })
            .collect()
    } else {
        let block_size = single_device_block_size(schema.len());
        (0..row_count.div_ceil(block_size))
            .map(|k| Block {
                index: k,
                device: schema.dataset_name.clone(),
                rows: clip(k * block_size, (k + 1) * block_size, row_count),
            })
            .collect()
    }
}

/// Data rows past the last block. Only multi-device datasets with more rows
/// than `devices x time` leave any.
pub fn uncovered_rows(blocks: &[Block], row_count: usize) -> usize {
    let covered = blocks.iter().map(|b| b.rows.end).max().unwrap_or(0);
    row_count.saturating_sub(covered)
}

fn clip(start: usize, end: usize, len: usize) -> Range<usize> {
    start.min(len)..end.min(len)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use etsi_common::LogicalType;
    use etsi_schema::Measurement;

    fn schema_with(measurements: usize) -> DatasetSchema {
        let list = (0..measurements)
            .map(|i| {
                let mut m = Measurement::new(format!("m{}", i), LogicalType::Double, "kW");
                m.column_order = i;
                m
            })
            .collect();
        DatasetSchema::new("root.ds", "ds", "m0", list)
    }

    #[test]
    fn test_block_size_thresholds() {
        assert_eq!(single_device_block_size(3), 131_072);
        assert_eq!(single_device_block_size(255), 131_072);
        assert_eq!(single_device_block_size(256), 32_768);
        assert_eq!(single_device_block_size(511), 32_768);
        assert_eq!(single_device_block_size(512), 8_192);
    }

    #[test]
    fn test_single_device_partition() {
        let schema = schema_with(600);
        let blocks = plan_blocks(&schema, 20_000);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].rows, 0..8_192);
        assert_eq!(blocks[2].rows, 16_384..20_000);
        assert!(blocks.iter().all(|b| b.device == "ds"));
        assert!(plan_blocks(&schema, 0).is_empty());
    }

    #[test]
    fn test_multi_device_partition() {
        let schema = schema_with(2)
            .with_devices(vec!["a".into(), "b".into(), "c".into()])
            .with_dimensions(vec![("id".into(), 3), ("time".into(), 4)]);
        let blocks = plan_blocks(&schema, 12);

        assert_eq!(blocks.len(), 3);
        for (k, block) in blocks.iter().enumerate() {
            assert_eq!(block.len(), 4);
            assert_eq!(block.rows.start, k * 4);
        }
        assert_eq!(blocks[1].device, "b");
    }

    #[test]
    fn test_multi_device_clipped() {
        let schema = schema_with(2)
            .with_devices(vec!["a".into(), "b".into(), "c".into()])
            .with_dimensions(vec![("time".into(), 4)]);
        let blocks = plan_blocks(&schema, 6);
        assert_eq!(blocks[1].rows, 4..6);
        assert!(blocks[2].is_empty());
    }

    #[test]
    fn test_multi_device_overflow_is_uncovered() {
        let schema = schema_with(2)
            .with_devices(vec!["a".into(), "b".into(), "c".into()])
            .with_dimensions(vec![("id".into(), 3), ("time".into(), 4)]);
        let blocks = plan_blocks(&schema, 14);

        assert_eq!(blocks.last().unwrap().rows, 8..12);
        assert_eq!(uncovered_rows(&blocks, 14), 2);
        assert_eq!(uncovered_rows(&blocks, 12), 0);
        assert_eq!(uncovered_rows(&plan_blocks(&schema_with(3), 20_000), 20_000), 0);
    }

    #[test]
    fn test_multi_device_without_time_dimension() {
        let schema = schema_with(2).with_devices(vec!["a".into(), "b".into()]);
        let blocks = plan_blocks(&schema, 5);
        assert_eq!(blocks[0].rows, 0..3);
        assert_eq!(blocks[1].rows, 3..5);
    }
}
