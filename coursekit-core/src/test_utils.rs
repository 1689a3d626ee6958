// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for building valid course trees in tests.

use chrono::{DateTime, Utc};

use crate::block::{Block, BlockContent, BlockFields, BlockType};
use crate::course::CourseConfig;
use crate::keys::{CourseKey, UsageKey};
use crate::tree::BlockTree;

/// Builds a valid course tree without the ceremony of hand-writing block
/// lists. Children are attached to the most recently added container at each
/// level.
#[derive(Debug)]
pub struct CourseBuilder {
    course_key: CourseKey,
    config: CourseConfig,
    blocks: Vec<Block>,
}

impl CourseBuilder {
    pub fn new(course_key: &str) -> Self {
        let course_key: CourseKey = course_key.parse().expect("valid course key literal");
        let root = course_key.root_usage_key();
        Self {
            course_key,
            config: CourseConfig::default(),
            blocks: vec![Block {
                usage_key: root,
                display_name: "Course".to_owned(),
                fields: BlockFields::default(),
                content: BlockContent::Course,
                children: Vec::new(),
            }],
        }
    }

    pub fn with_config(mut self, config: CourseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_course_start(mut self, start: DateTime<Utc>) -> Self {
        self.config.start = Some(start);
        self
    }

    /// Add a block under the given parent. Panics on invalid ids; fixtures
    /// use literals.
    pub fn add(
        &mut self,
        parent: &UsageKey,
        block_type: BlockType,
        block_id: &str,
    ) -> UsageKey {
        self.add_block(parent, block_type, block_id, BlockFields::default())
    }

    /// Add a block with explicit fields under the given parent.
    pub fn add_block(
        &mut self,
        parent: &UsageKey,
        block_type: BlockType,
        block_id: &str,
        fields: BlockFields,
    ) -> UsageKey {
        let content = match block_type {
            BlockType::Course => BlockContent::Course,
            BlockType::Chapter | BlockType::Sequential | BlockType::Vertical => {
                BlockContent::Container
            }
            BlockType::Html => BlockContent::Html {
                html: format!("<p>{}</p>", block_id),
            },
            BlockType::Video => BlockContent::Video {
                source: format!("https://cdn.example/{}.mp4", block_id),
                duration_secs: None,
            },
            BlockType::Problem => BlockContent::Problem {
                definition: serde_json::json!({}),
            },
            BlockType::Unknown(_) => BlockContent::Unknown {
                data: serde_json::Value::Null,
            },
        };
        self.add_with_content(parent, block_type, block_id, fields, content)
    }

    /// Add a block with explicit fields and content.
    pub fn add_with_content(
        &mut self,
        parent: &UsageKey,
        block_type: BlockType,
        block_id: &str,
        fields: BlockFields,
        content: BlockContent,
    ) -> UsageKey {
        let key = self
            .course_key
            .make_usage_key(block_type, block_id)
            .expect("valid block id literal");

        let parent_block = self
            .blocks
            .iter_mut()
            .find(|block| &block.usage_key == parent)
            .expect("parent added before child");
        parent_block.children.push(key.clone());

        self.blocks.push(Block {
            usage_key: key.clone(),
            display_name: block_id.to_owned(),
            fields,
            content,
            children: Vec::new(),
        });
        key
    }

    pub fn root_key(&self) -> UsageKey {
        self.course_key.root_usage_key()
    }

    pub fn course_key(&self) -> &CourseKey {
        &self.course_key
    }

    pub fn build(self) -> BlockTree {
        BlockTree::new(self.course_key, self.config, self.blocks)
            .expect("builder produces valid trees")
    }
}
