//! railyard のリモートコマンド実行
//!
//! デプロイエンジンは直接ネットワークに触れない。[`RemoteCommand`] を組み立てて
//! [`Transport`] に渡す。本番実装は [`SshTransport`]、
//! テスト用には呼び出しを記録する `MockTransport`（feature
//! `test-utils`）がある。

pub mod broadcast;
pub mod command;
pub mod error;
pub mod ssh;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use broadcast::{HostOutput, broadcast, capture, run, upload_all};
pub use command::{Arg, RemoteCommand, Step, shell_quote};
pub use error::{RemoteError, Result};
pub use ssh::SshTransport;
pub use transport::{CommandOutput, Transport};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{Call, MockTransport, Upload};
