//! コメント用フレーズバンク
//!
//! コメントモードごとの定型文、ユーザー名トークン、リアクション絵文字を
//! 静的テーブルとして保持する。すべて読み取り専用。

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// コメントモード（どのフレーズバンクからコメントを引くか）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    #[default]
    Fanboy,
    Troll,
    Romantic,
    Multilingual,
}

impl CommentMode {
    /// すべてのモード（表示順）
    pub const ALL: [CommentMode; 4] = [
        CommentMode::Fanboy,
        CommentMode::Troll,
        CommentMode::Romantic,
        CommentMode::Multilingual,
    ];

    /// 永続化キー
    pub fn as_key(&self) -> &'static str {
        match self {
            CommentMode::Fanboy => "fanboy",
            CommentMode::Troll => "troll",
            CommentMode::Romantic => "romantic",
            CommentMode::Multilingual => "multilingual",
        }
    }

    /// 表示名
    pub fn display_name(&self) -> &'static str {
        match self {
            CommentMode::Fanboy => "Fanboy",
            CommentMode::Troll => "Troll",
            CommentMode::Romantic => "Romantic",
            CommentMode::Multilingual => "Multilingual",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "fanboy" => Some(CommentMode::Fanboy),
            "troll" => Some(CommentMode::Troll),
            "romantic" => Some(CommentMode::Romantic),
            "multilingual" => Some(CommentMode::Multilingual),
            _ => None,
        }
    }

    /// キーを解決する。未知のキーは常にFanboyにフォールバック
    pub fn resolve(key: &str) -> Self {
        Self::from_key(key).unwrap_or_else(|| {
            tracing::debug!("💬 [PHRASES] Unknown comment mode '{}', using fanboy", key);
            CommentMode::Fanboy
        })
    }
}

const FANBOY_PHRASES: &[&str] = &[
    "OMG you're amazing!! 🔥",
    "Best stream ever!!!",
    "I've been waiting all day for this",
    "Can you say hi to me? 🙏",
    "You're literally my favorite creator",
    "Notifications ON forever 🔔",
    "This is going viral for sure",
    "Shared this with all my friends!",
    "LEGEND 👑",
    "How are you so talented?!",
    "Sending love from Brazil 🇧🇷",
    "Day one fan right here 🙋",
];

const TROLL_PHRASES: &[&str] = &[
    "first",
    "is this live or a rerun lol",
    "who's actually watching this",
    "ratio",
    "the audio is lagging bro",
    "skip skip skip",
    "my cat could do better",
    "ok but why tho",
    "L stream",
    "nobody asked 💀",
    "bring back the old intro",
    "touch grass",
];

const ROMANTIC_PHRASES: &[&str] = &[
    "Your smile just made my day 😍",
    "Marry me? 💍",
    "Heart eyes for real 😍😍",
    "You look stunning today ✨",
    "Can't stop staring 🥰",
    "Be my valentine? 💘",
    "Your voice is so calming",
    "Falling for you every stream ❤️",
    "Sending you a virtual hug 🤗",
    "You're glowing tonight 🌹",
];

const MULTILINGUAL_PHRASES: &[&str] = &[
    "¡Hola desde México! 🇲🇽",
    "Bonjour de Paris 🇫🇷",
    "こんにちは！大好き！",
    "Ciao bella! 🇮🇹",
    "Привет из Москвы",
    "안녕하세요! 최고예요!",
    "Olá do Brasil!",
    "Hallo aus Berlin 🇩🇪",
    "नमस्ते! बहुत बढ़िया!",
    "Merhaba! Harika yayın",
    "你好！太棒了！",
    "Hej från Sverige 🇸🇪",
];

/// ユーザー名の接頭辞トークン
pub const USERNAME_PREFIXES: &[&str] = &[
    "user", "fan", "viewer", "stream", "live", "watch", "love", "cool",
];

/// ユーザー名の接尾辞トークン
pub const USERNAME_SUFFIXES: &[&str] = &[
    "123", "456", "789", "pro", "fan", "lover", "star", "king", "queen",
];

/// 浮遊リアクション用の絵文字セット
pub const REACTIONS: &[&str] = &["❤️", "😍", "🔥", "👏", "😂", "😮", "💯", "🎉"];

/// モードに対応するフレーズ一覧
pub fn phrases(mode: CommentMode) -> &'static [&'static str] {
    match mode {
        CommentMode::Fanboy => FANBOY_PHRASES,
        CommentMode::Troll => TROLL_PHRASES,
        CommentMode::Romantic => ROMANTIC_PHRASES,
        CommentMode::Multilingual => MULTILINGUAL_PHRASES,
    }
}

/// フレーズを一様ランダムに1つ選ぶ
pub fn draw_phrase<R: Rng + ?Sized>(mode: CommentMode, rng: &mut R) -> &'static str {
    phrases(mode)
        .choose(rng)
        .copied()
        .unwrap_or(FANBOY_PHRASES[0])
}

/// 接頭辞と接尾辞を連結してユーザー名を合成
pub fn draw_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = USERNAME_PREFIXES.choose(rng).copied().unwrap_or("user");
    let suffix = USERNAME_SUFFIXES.choose(rng).copied().unwrap_or("123");
    format!("{}{}", prefix, suffix)
}

pub fn draw_reaction<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    REACTIONS.choose(rng).copied().unwrap_or("❤️")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_mode_keys_round_trip() {
        for mode in CommentMode::ALL {
            assert_eq!(CommentMode::from_key(mode.as_key()), Some(mode));
        }
        assert_eq!(CommentMode::from_key("TROLL"), Some(CommentMode::Troll));
    }

    #[test]
    fn test_unknown_mode_falls_back_to_fanboy() {
        assert_eq!(CommentMode::from_key("sarcastic"), None);
        assert_eq!(CommentMode::resolve("sarcastic"), CommentMode::Fanboy);
        assert_eq!(CommentMode::resolve(""), CommentMode::Fanboy);
    }

    #[test]
    fn test_banks_are_non_empty_and_disjoint() {
        let mut seen = HashSet::new();
        for mode in CommentMode::ALL {
            let bank = phrases(mode);
            assert!(!bank.is_empty(), "{:?} bank is empty", mode);
            for phrase in bank {
                assert!(seen.insert(*phrase), "phrase shared between banks: {}", phrase);
            }
        }
    }

    #[test]
    fn test_draw_phrase_stays_in_bank() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let phrase = draw_phrase(CommentMode::Troll, &mut rng);
            assert!(phrases(CommentMode::Troll).contains(&phrase));
        }
    }

    #[test]
    fn test_username_is_prefix_plus_suffix() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let name = draw_username(&mut rng);
            let prefix = USERNAME_PREFIXES
                .iter()
                .find(|p| name.starts_with(**p))
                .expect("known prefix");
            let rest = &name[prefix.len()..];
            assert!(USERNAME_SUFFIXES.contains(&rest), "unexpected suffix in {}", name);
        }
    }

    #[test]
    fn test_draw_reaction_uses_reaction_set() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(REACTIONS.contains(&draw_reaction(&mut rng)));
        }
    }
}
