//! 免責表示とウォーターマーク

pub const DISCLAIMER_TITLE: &str = "⚠️ DISCLAIMER";
pub const DISCLAIMER_HEADLINE: &str = "FOR ENTERTAINMENT ONLY";
pub const DISCLAIMER_BODY: &str = "This is a simulated livestream experience. All viewers, comments, and interactions are fake and generated for entertainment purposes only.";
pub const DISCLAIMER_WARNING: &str =
    "Do not use this content to mislead others about your actual social media engagement.";
pub const DISCLAIMER_DISMISS_LABEL: &str = "I Understand";
pub const WATERMARK_TEXT: &str = "🎭 VIRALSTAGE - FAKE STREAM";

/// 免責オーバーレイの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclaimerOverlay {
    visible: bool,
    show_watermark: bool,
}

impl DisclaimerOverlay {
    pub fn new(show_watermark: bool) -> Self {
        Self {
            visible: false,
            show_watermark,
        }
    }

    /// 表示する。既に表示中ならfalse
    pub fn show(&mut self) -> bool {
        !std::mem::replace(&mut self.visible, true)
    }

    /// 閉じる。既に非表示ならfalse
    pub fn dismiss(&mut self) -> bool {
        std::mem::replace(&mut self.visible, false)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_show_watermark(&mut self, enabled: bool) {
        self.show_watermark = enabled;
    }

    pub fn show_watermark(&self) -> bool {
        self.show_watermark
    }

    /// ウォーターマークが有効な場合のみ文言を返す
    pub fn watermark(&self) -> Option<&'static str> {
        self.show_watermark.then_some(WATERMARK_TEXT)
    }

    /// 表示用の行
    pub fn lines(&self) -> Vec<&'static str> {
        let mut lines = vec![
            DISCLAIMER_TITLE,
            DISCLAIMER_HEADLINE,
            DISCLAIMER_BODY,
            DISCLAIMER_WARNING,
        ];
        lines.extend(self.watermark());
        lines
    }
}

impl Default for DisclaimerOverlay {
    fn default() -> Self {
        Self::new(true)
    }
}
