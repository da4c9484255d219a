//! Window Module
//!
//! 結合済みリレーションを固定サイズの行ウィンドウへ分割するモジュール。
//! ウィンドウは遅延生成・前方一方向のイテレータとして提供され、全ウィンドウが
//! 同時にメモリへ存在することはありません（常駐するのは結合済みリレーション
//! 本体のみ）。

use crate::types::{CellScalar, Relation};

/// 結合済みリレーションの連続スライス
///
/// `rows`はリレーション本体からの借用であり、コピーを持ちません。
#[derive(Debug)]
pub(crate) struct Window<'a> {
    /// ウィンドウ番号（0始まり、出力シート名の元）
    pub index: usize,

    /// リレーション全体におけるこのウィンドウの先頭行の位置
    pub offset: usize,

    /// 列名（リレーションと共有）
    pub columns: &'a [String],

    /// このウィンドウに含まれる行
    pub rows: &'a [Vec<CellScalar>],
}

/// ウィンドウ列を生成するイテレータ
///
/// 位置 `[i*size, min((i+1)*size, total))` のスライスを i = 0, 1, 2, … の
/// 順に返します。有限・連続・重複なしで、放出順にすべてのウィンドウを
/// 連結するとリレーション全体が正確に再現されます。巻き戻しはできません
/// （前方一方向の1パスで十分という前提）。
pub(crate) struct Windows<'a> {
    relation: &'a Relation,
    size: usize,
    pos: usize,
    index: usize,
}

impl Relation {
    /// 固定サイズの行ウィンドウ列を生成
    ///
    /// # 引数
    ///
    /// * `size` - ウィンドウあたりの最大行数（1以上であること。ビルダーが
    ///   検証済み）
    pub(crate) fn windows(&self, size: usize) -> Windows<'_> {
        debug_assert!(size > 0);
        Windows {
            relation: self,
            size,
            pos: 0,
            index: 0,
        }
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.relation.height() {
            return None;
        }

        let end = (self.pos + self.size).min(self.relation.height());
        let window = Window {
            index: self.index,
            offset: self.pos,
            columns: self.relation.columns(),
            rows: &self.relation.rows()[self.pos..end],
        };
        self.pos = end;
        self.index += 1;
        Some(window)
    }
}
