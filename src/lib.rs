//! bird-ai ライブラリ
//!
//! 写真フォルダを走査し、鳥を検出・識別して名前を検証し、
//! 写真をリネームしてコピーしたうえで探鳥記録を書き出す。

pub mod cli;
pub mod config;
pub mod error;
pub mod scanner;
pub mod detector;
pub mod analyzer;
pub mod reference;
pub mod pipeline;
pub mod export;
