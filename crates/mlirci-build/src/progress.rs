use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// pull / push のレイヤー進捗をスピナー 1 行で表示
///
/// 端末でない場合（Jenkins のログなど）は indicatif が描画を省略する。
pub struct TransferProgress {
    progress_bar: ProgressBar,
}

impl TransferProgress {
    pub fn new(action: &str, image: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("{} {}...", action, image));

        Self { progress_bar: pb }
    }

    /// レイヤー ID 付きのステータス行を反映
    pub fn update(&self, id: Option<&str>, status: &str, progress: Option<&str>) {
        let line = match id {
            Some(id) => format!("{}: {} {}", id, status, progress.unwrap_or("")),
            None => format!("{} {}", status, progress.unwrap_or("")),
        };
        self.progress_bar.set_message(line.trim_end().to_string());
        self.progress_bar.tick();
    }

    /// 完了したレイヤーなどをスピナーの上に残す
    pub fn println(&self, line: &str) {
        self.progress_bar.println(line);
    }

    pub fn finish_success(&self, message: &str) {
        self.progress_bar
            .finish_with_message(format!("{} {}", "✓".green(), message));
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("{} {}", "✗".red(), error));
    }
}
