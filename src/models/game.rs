//! 游戏代码与 UIGF 版本

use std::fmt;

/// UIGF 4.x 支持的游戏，按查找顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Game {
    Genshin,
    StarRail,
    ZenlessZoneZero,
}

impl Game {
    pub const ALL: [Game; 3] = [Game::Genshin, Game::StarRail, Game::ZenlessZoneZero];

    pub fn code(self) -> &'static str {
        match self {
            Game::Genshin => "hk4e",
            Game::StarRail => "hkrpg",
            Game::ZenlessZoneZero => "nap",
        }
    }

    /// 设置数据库中的 Game 选项名
    pub fn display_name(self) -> &'static str {
        match self {
            Game::Genshin => "原神",
            Game::StarRail => "スターレイル",
            Game::ZenlessZoneZero => "ゼンレスゾーンゼロ",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.display_name() == name)
    }
}

/// 未知代码原样返回
pub fn game_name_for_code(code: &str) -> String {
    Game::from_code(code)
        .map(|g| g.display_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

pub fn game_code_for_name(name: &str) -> &'static str {
    Game::from_display_name(name).unwrap_or(Game::Genshin).code()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UigfVersion {
    V3,
    V4,
}

impl UigfVersion {
    /// "v4.1"、"4.0"、"v3.0" 等都可以，主版本不是 4 的一律视为 V3
    pub fn detect(raw: &str) -> Self {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.split('.').next() == Some("4") {
            UigfVersion::V4
        } else {
            UigfVersion::V3
        }
    }

    /// 导出文件中写入的版本号
    pub fn export_tag(self) -> &'static str {
        match self {
            UigfVersion::V3 => "v3.0",
            UigfVersion::V4 => "v4.1",
        }
    }
}

impl fmt::Display for UigfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_tag())
    }
}
