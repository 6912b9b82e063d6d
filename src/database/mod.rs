//! 翻訳キャッシュデータベース
//!
//! `(message, target_lang)` をキーとするSQLiteのメモ化テーブル。
//! 翻訳APIを呼ぶ前に既訳を引き、新しい翻訳はupsertで書き込む。
//! サイズ上限を超えた場合はファイルごと削除して作り直す（LRUではない）。

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// データベースの最大サイズ（50MB）
pub const MAX_SIZE: u64 = 52_428_800;

/// 翻訳キャッシュの1行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub message: String,
    pub translation: String,
    pub target_lang: String,
    pub created_at: String,
}

/// 統計情報
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStatistics {
    pub total_translations: i64,
    /// 言語コードと件数のペア（件数降順）
    pub language_stats: Vec<(String, i64)>,
    pub database_size: u64,
}

/// 翻訳データベース管理クラス
pub struct TranslationDatabase {
    /// `None` はインメモリデータベース（テスト用）
    db_path: Option<PathBuf>,
    connection: Mutex<Connection>,
}

impl TranslationDatabase {
    /// ファイルパスを指定して作成し、スキーマを初期化
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(&db_path)?;
        connection.execute_batch(include_str!("schema.sql"))?;
        tracing::info!("翻訳データベースを初期化しました: {:?}", db_path);

        Ok(Self {
            db_path: Some(db_path),
            connection: Mutex::new(connection),
        })
    }

    /// インメモリデータベースを作成（テスト用）
    pub fn new_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// 翻訳を保存（既存の同一キーは置き換え）
    pub async fn save_translation(
        &self,
        message: &str,
        translation: &str,
        target_lang: &str,
    ) -> bool {
        let conn = self.connection.lock().await;
        let result = conn.execute(
            "INSERT OR REPLACE INTO translations (message, target_lang, translation)
             VALUES (?1, ?2, ?3)",
            params![message, target_lang, translation],
        );

        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("翻訳保存エラー: {}", e);
                false
            }
        }
    }

    /// 翻訳を取得
    pub async fn get_translation(&self, message: &str, target_lang: &str) -> Option<String> {
        let conn = self.connection.lock().await;
        let result = conn
            .query_row(
                "SELECT translation FROM translations
                 WHERE message = ?1 AND target_lang = ?2",
                params![message, target_lang],
                |row| row.get::<_, String>(0),
            )
            .ok();

        result
    }

    /// 最近の翻訳履歴を取得
    pub async fn get_recent_translations(&self, limit: usize) -> Vec<TranslationRecord> {
        let conn = self.connection.lock().await;

        let mut stmt = match conn.prepare(
            "SELECT message, translation, target_lang, created_at
             FROM translations
             ORDER BY created_at DESC
             LIMIT ?1",
        ) {
            Ok(stmt) => stmt,
            Err(e) => {
                tracing::error!("翻訳履歴取得エラー: {}", e);
                return Vec::new();
            }
        };

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TranslationRecord {
                message: row.get(0)?,
                translation: row.get(1)?,
                target_lang: row.get(2)?,
                created_at: row.get(3)?,
            })
        });

        match rows {
            Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
            Err(e) => {
                tracing::error!("翻訳履歴取得エラー: {}", e);
                Vec::new()
            }
        }
    }

    /// 統計情報を取得
    pub async fn get_statistics(&self) -> DbStatistics {
        let conn = self.connection.lock().await;

        let total_translations = conn
            .query_row("SELECT COUNT(*) FROM translations", [], |row| {
                row.get::<_, i64>(0)
            })
            .unwrap_or(0);

        let language_stats = conn
            .prepare(
                "SELECT target_lang, COUNT(*) FROM translations
                 GROUP BY target_lang ORDER BY COUNT(*) DESC",
            )
            .and_then(|mut stmt| {
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .filter_map(|r| r.ok())
                    .collect::<Vec<_>>();
                Ok(rows)
            })
            .unwrap_or_default();

        let database_size = self.file_size();

        DbStatistics {
            total_translations,
            language_stats,
            database_size,
        }
    }

    /// 古い翻訳を削除し、削除件数を返す
    pub async fn cleanup_old_translations(&self, keep_days: i64) -> usize {
        let conn = self.connection.lock().await;
        let result = conn.execute(
            "DELETE FROM translations
             WHERE created_at < datetime('now', ?1 || ' days')",
            params![-keep_days],
        );

        match result {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("翻訳クリーンアップエラー: {}", e);
                0
            }
        }
    }

    /// サイズチェックとクリーンアップ
    ///
    /// ファイルサイズが上限以上ならデータベースを削除して作り直す。
    /// リセットが行われた場合に `true` を返す。
    pub async fn check_size_and_cleanup(&self) -> bool {
        self.cleanup_if_larger_than(MAX_SIZE).await
    }

    /// 指定サイズ以上ならリセット（上限を変えてテストできるように分離）
    pub async fn cleanup_if_larger_than(&self, limit: u64) -> bool {
        let size = self.file_size();
        if size < limit {
            return false;
        }

        let mut conn = self.connection.lock().await;

        let new_connection = match &self.db_path {
            Some(path) => {
                // 接続を閉じてからファイルを消すため、一旦インメモリに差し替える
                let placeholder = match Connection::open_in_memory() {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::error!("データベースリセットエラー: {}", e);
                        return false;
                    }
                };
                drop(std::mem::replace(&mut *conn, placeholder));

                if let Err(e) = std::fs::remove_file(path) {
                    tracing::error!("データベースファイル削除エラー: {}", e);
                }

                Connection::open(path)
            }
            None => Connection::open_in_memory(),
        };

        match new_connection {
            Ok(c) => {
                if let Err(e) = c.execute_batch(include_str!("schema.sql")) {
                    tracing::error!("スキーマ再初期化エラー: {}", e);
                    return false;
                }
                *conn = c;
                tracing::info!("データベースサイズが上限に達したためリセットしました ({} bytes)", size);
                true
            }
            Err(e) => {
                tracing::error!("データベース再作成エラー: {}", e);
                false
            }
        }
    }

    /// データベース最適化
    pub async fn vacuum(&self) -> bool {
        let conn = self.connection.lock().await;
        match conn.execute_batch("VACUUM") {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("データベース最適化エラー: {}", e);
                false
            }
        }
    }

    fn file_size(&self) -> u64 {
        self.db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// XDGデータディレクトリからデータベースパスを取得
pub fn get_database_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("dev", "sifyfy", "transneo")
        .ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;

    let data_dir = project_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("translations.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_get() {
        let db = TranslationDatabase::new_in_memory().unwrap();
        assert!(db.save_translation("hello", "こんにちは", "ja").await);
        assert_eq!(
            db.get_translation("hello", "ja").await.as_deref(),
            Some("こんにちは")
        );
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db = TranslationDatabase::new_in_memory().unwrap();
        assert_eq!(db.get_translation("unknown", "ja").await, None);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let db = TranslationDatabase::new_in_memory().unwrap();
        db.save_translation("hello", "やあ", "ja").await;
        db.save_translation("hello", "こんにちは", "ja").await;

        assert_eq!(
            db.get_translation("hello", "ja").await.as_deref(),
            Some("こんにちは")
        );
        let stats = db.get_statistics().await;
        assert_eq!(stats.total_translations, 1);
    }

    #[tokio::test]
    async fn test_same_message_different_lang_is_separate() {
        let db = TranslationDatabase::new_in_memory().unwrap();
        db.save_translation("hello", "こんにちは", "ja").await;
        db.save_translation("hello", "안녕하세요", "ko").await;

        let stats = db.get_statistics().await;
        assert_eq!(stats.total_translations, 2);
    }

    #[tokio::test]
    async fn test_size_cleanup_wipes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.db");
        let db = TranslationDatabase::new(&path).unwrap();

        for i in 0..100 {
            db.save_translation(&format!("message number {}", i), "translated", "ja")
                .await;
        }
        assert!(db.get_translation("message number 0", "ja").await.is_some());

        // ファイルサイズは必ず1バイト以上あるので、上限1でリセットが走る
        assert!(db.cleanup_if_larger_than(1).await);

        assert_eq!(db.get_translation("message number 0", "ja").await, None);
        let stats = db.get_statistics().await;
        assert_eq!(stats.total_translations, 0);

        // リセット後も書き込める
        assert!(db.save_translation("after reset", "リセット後", "ja").await);
    }

    #[tokio::test]
    async fn test_size_cleanup_below_threshold_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.db");
        let db = TranslationDatabase::new(&path).unwrap();

        db.save_translation("keep me", "保持", "ja").await;
        assert!(!db.check_size_and_cleanup().await);
        assert!(db.get_translation("keep me", "ja").await.is_some());
    }

    #[tokio::test]
    async fn test_recent_translations_limit() {
        let db = TranslationDatabase::new_in_memory().unwrap();
        for i in 0..10 {
            db.save_translation(&format!("m{}", i), &format!("t{}", i), "en")
                .await;
        }

        let recent = db.get_recent_translations(5).await;
        assert_eq!(recent.len(), 5);
    }

    #[tokio::test]
    async fn test_vacuum() {
        let db = TranslationDatabase::new_in_memory().unwrap();
        assert!(db.vacuum().await);
    }
}
