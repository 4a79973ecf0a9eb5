/// ドメイン層: 画像プレビューのハンドル管理
///
/// 画像ファイルの受け付け時にハンドルを発行し、セッションがレジストリから
/// 外れた時点で解放する。実際のプレビュー生成は表示側の関心事なので、
/// ここでは発行済みハンドルとファイル名の対応だけを保持する。
use crate::domain::file::CandidateFile;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 一時プレビューへの不透明な参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewHandle(Uuid);

#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    live: Arc<Mutex<HashMap<PreviewHandle, String>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 画像ファイルであればハンドルを発行する
    pub fn create_for(&self, file: &CandidateFile) -> Option<PreviewHandle> {
        if !file.is_image() {
            return None;
        }
        let handle = PreviewHandle(Uuid::new_v4());
        self.live.lock().insert(handle, file.name.clone());
        debug!(name = %file.name, "preview created");
        Some(handle)
    }

    /// ハンドルを解放する。解放済みなら false
    pub fn release(&self, handle: PreviewHandle) -> bool {
        let released = self.live.lock().remove(&handle);
        if let Some(name) = &released {
            debug!(name = %name, "preview released");
        }
        released.is_some()
    }

    /// 解放されていないハンドル数
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}
