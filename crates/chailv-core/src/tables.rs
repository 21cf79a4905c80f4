//! Policy reference tables
//!
//! Both tables are opaque text blobs. Nothing here parses rows or columns;
//! the model reads them as-is.

use anyhow::Result;

use crate::store::TableStore;

pub const PRESET_REGION_DATA: &str = "\
地区类别,包含城市/地区
一类地区,北京、上海、广州、深圳
二类地区,天津、重庆、杭州、南京、苏州、成都、武汉、西安、厦门、青岛、大连、宁波
三类地区,其他省会城市及计划单列市
四类地区,其他地级市、县及以下地区
港澳台及海外,香港、澳门、台湾及境外地区（按集团外事规定执行）";

pub const PRESET_STANDARD_DATA: &str = "\
单位,职级,交通工具,住宿标准(一类/二类/三类/四类 元/天),伙食补助(元/天),在途日补助(元/天),始末日补助(元/天),备注
津药集团本部,高层,飞机经济舱/高铁一等座/轮船二等舱,800/650/550/450,120,100,80,住宿凭票据实报实销不超过标准
津药集团本部,中层,高铁二等座/动车二等座/轮船三等舱,600/500/450/350,100,80,60,超标部分自理
津药集团本部,基层,高铁二等座/普通列车硬卧/轮船三等舱,450/400/350/300,80,60,50,超标部分自理
达仁堂,高层,飞机经济舱/高铁一等座/轮船二等舱,750/600/500/420,110,90,70,同集团本部审批流程
达仁堂,中层,高铁二等座/动车二等座/轮船三等舱,550/480/420/330,90,70,55,超标部分自理
达仁堂,基层,高铁二等座/普通列车硬卧/轮船三等舱,420/380/330/280,75,55,45,超标部分自理
中新药业,高层,飞机经济舱/高铁一等座/轮船二等舱,750/600/500/420,110,90,70,同集团本部审批流程
中新药业,中层,高铁二等座/动车二等座/轮船三等舱,550/480/420/330,90,70,55,超标部分自理
中新药业,基层,高铁二等座/普通列车硬卧/轮船三等舱,420/380/330/280,75,55,45,超标部分自理";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Region,
    Standard,
}

impl TableKind {
    pub fn all() -> [TableKind; 2] {
        [TableKind::Region, TableKind::Standard]
    }

    /// Storage key of the persisted blob
    pub fn key(&self) -> &'static str {
        match self {
            TableKind::Region => "jinyao_region_data",
            TableKind::Standard => "jinyao_standard_data",
        }
    }

    pub fn preset(&self) -> &'static str {
        match self {
            TableKind::Region => PRESET_REGION_DATA,
            TableKind::Standard => PRESET_STANDARD_DATA,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TableKind::Region => "地区分类表",
            TableKind::Standard => "差旅标准表",
        }
    }

    pub fn other(&self) -> TableKind {
        match self {
            TableKind::Region => TableKind::Standard,
            TableKind::Standard => TableKind::Region,
        }
    }
}

/// Number of non-blank lines in a table blob
pub fn line_count(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

/// The two reference tables, backed by the persistence adapter
pub struct PolicyTables {
    region: String,
    standard: String,
    store: TableStore,
}

impl PolicyTables {
    /// Load both tables, falling back to the presets when nothing is stored
    pub fn load(store: TableStore) -> Self {
        let region = store.load(TableKind::Region.key(), PRESET_REGION_DATA);
        let standard = store.load(TableKind::Standard.key(), PRESET_STANDARD_DATA);
        Self {
            region,
            standard,
            store,
        }
    }

    pub fn get(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Region => &self.region,
            TableKind::Standard => &self.standard,
        }
    }

    /// Replace a table and write it through to the store. The in-memory
    /// text is updated even when the write fails.
    pub fn set(&mut self, kind: TableKind, text: String) -> Result<()> {
        match kind {
            TableKind::Region => self.region = text,
            TableKind::Standard => self.standard = text,
        }
        self.store.save(kind.key(), self.get(kind))
    }

    /// Edit a table in place and persist the result
    pub fn edit<F>(&mut self, kind: TableKind, f: F) -> Result<()>
    where
        F: FnOnce(&mut String),
    {
        let mut text = self.get(kind).to_string();
        f(&mut text);
        self.set(kind, text)
    }

    /// Restore both presets and drop the persisted overrides
    pub fn reset(&mut self) -> Result<()> {
        self.region = PRESET_REGION_DATA.to_string();
        self.standard = PRESET_STANDARD_DATA.to_string();
        for kind in TableKind::all() {
            self.store.clear(kind.key())?;
        }
        Ok(())
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }
}
