//! UseCase 層
//!
//! 接続の受け付けとメッセージのルーティングを担うハブを実装するレイヤー。
//! UI 層から呼び出され、Domain 層の Client trait を通じて各接続を操作します。

pub mod error;
pub mod hub;

pub use error::HubError;
pub use hub::Hub;
