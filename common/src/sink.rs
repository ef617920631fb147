//! 進捗ナレーションの出力先

/// 1行ずつ人間向けの進捗を受け取るコールバック
///
/// 戻り値は持たず、パイプライン側はこれの完了を待たない前提で呼び出す
pub trait LogSink: Send + Sync {
    fn line(&self, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn line(&self, message: &str) {
        self(message)
    }
}

/// 何も出力しないシンク
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn line(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let lines = Mutex::new(Vec::new());
        let sink = |m: &str| lines.lock().unwrap().push(m.to_string());
        sink.line("first");
        sink.line("second");
        assert_eq!(*lines.lock().unwrap(), vec!["first", "second"]);
    }
}
