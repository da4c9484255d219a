//! Cross-Join Engine Module
//!
//! リレーション列全体のデカルト積（クロス結合）を計算するモジュール。
//! 左から右への畳み込みで、外側（累積側）優先の行順を厳密に再現します。

use std::collections::HashSet;

use crate::types::{CellScalar, Relation};

/// リレーション列全体のクロス結合を計算
///
/// 先頭のリレーションから順に畳み込みます。各ステップでは累積リレーションの
/// 各行（外側ループ）に対し、次のリレーションの全行（内側ループ）を元の順序で
/// 組み合わせ、両者の列の連結を持つ新しい行を生成します。この畳み込みは
/// 結果の行集合としては結合順序に依存しませんが、行の順序は「外側優先・
/// シート出現順」に固定され、出力の決定性のために厳密に保たれます。
///
/// 結果の行数は各リレーションのデータ行数の積、列数は各リレーションの
/// 列数の和です。列名が衝突した場合は後から現れた列に `_{k}`（kは一意に
/// なる最小の正整数）を付けます。最初の出現は無印のままです。
///
/// # 引数
///
/// * `relations` - 結合対象のリレーション列（受付検査により2個以上が保証
///   されるが、この関数自体は任意の個数を受け付ける）
///
/// # 戻り値
///
/// 結合済みリレーション。入力が空の場合は0列1行の単位元を返します。
pub(crate) fn cross_join_all(relations: &[Relation]) -> Relation {
    // 1. 列名の連結と衝突の解決
    let mut used = HashSet::new();
    let mut columns = Vec::new();
    for relation in relations {
        for name in relation.columns() {
            columns.push(disambiguate(name, &mut used));
        }
    }

    // 2. 行の畳み込み（単位元: 空の行が1つ）
    let mut acc_rows: Vec<Vec<CellScalar>> = vec![Vec::new()];
    for relation in relations {
        let mut next = Vec::with_capacity(acc_rows.len().saturating_mul(relation.height()));
        for left in &acc_rows {
            for right in relation.rows() {
                let mut row = Vec::with_capacity(left.len() + right.len());
                row.extend(left.iter().cloned());
                row.extend(right.iter().cloned());
                next.push(row);
            }
        }
        acc_rows = next;
    }

    Relation::from_rows_unchecked(columns, acc_rows)
}

/// 列名の衝突を解決（プライベート）
///
/// 既出の名前と衝突した場合、`_{k}`を付けた最初の未使用名を返します。
fn disambiguate(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let mut k = 1usize;
    loop {
        let candidate = format!("{}_{}", name, k);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        k += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Relation;

    fn relation_of_numbers(column: &str, values: &[f64]) -> Relation {
        let rows = values
            .iter()
            .map(|v| vec![CellScalar::Number(*v)])
            .collect();
        Relation::from_rows(vec![column.to_string()], rows).unwrap()
    }

    #[test]
    fn test_cross_join_row_and_column_counts() {
        let a = relation_of_numbers("a", &[1.0, 2.0]);
        let b = relation_of_numbers("b", &[10.0, 20.0, 30.0]);

        let joined = cross_join_all(&[a, b]);
        // 行数は積、列数は和
        assert_eq!(joined.height(), 6);
        assert_eq!(joined.width(), 2);
        assert_eq!(joined.columns(), &["a", "b"]);
    }

    #[test]
    fn test_cross_join_outer_major_order() {
        let a = relation_of_numbers("a", &[1.0, 2.0]);
        let b = relation_of_numbers("b", &[10.0, 20.0, 30.0]);

        let joined = cross_join_all(&[a, b]);

        // 外側（左）優先の順序: (1,10),(1,20),(1,30),(2,10),(2,20),(2,30)
        let expected = [
            (1.0, 10.0),
            (1.0, 20.0),
            (1.0, 30.0),
            (2.0, 10.0),
            (2.0, 20.0),
            (2.0, 30.0),
        ];
        for (row, (ea, eb)) in joined.rows().iter().zip(expected.iter()) {
            assert_eq!(row[0], CellScalar::Number(*ea));
            assert_eq!(row[1], CellScalar::Number(*eb));
        }
    }

    #[test]
    fn test_cross_join_three_relations() {
        let a = relation_of_numbers("a", &[1.0, 2.0]);
        let b = relation_of_numbers("b", &[10.0, 20.0, 30.0]);
        let c = relation_of_numbers("c", &[100.0, 200.0, 300.0, 400.0]);

        let joined = cross_join_all(&[a, b, c]);
        assert_eq!(joined.height(), 2 * 3 * 4);
        assert_eq!(joined.width(), 3);

        // 先頭行はすべて各リレーションの先頭、末尾行はすべて末尾
        assert_eq!(
            joined.rows()[0],
            vec![
                CellScalar::Number(1.0),
                CellScalar::Number(10.0),
                CellScalar::Number(100.0)
            ]
        );
        assert_eq!(
            joined.rows()[23],
            vec![
                CellScalar::Number(2.0),
                CellScalar::Number(30.0),
                CellScalar::Number(400.0)
            ]
        );
        // 最内（最右）のリレーションが最も速く回る
        assert_eq!(joined.rows()[1][2], CellScalar::Number(200.0));
    }

    #[test]
    fn test_cross_join_column_collision_suffix() {
        let a = relation_of_numbers("id", &[1.0]);
        let b = relation_of_numbers("id", &[2.0]);
        let c = relation_of_numbers("id", &[3.0]);

        let joined = cross_join_all(&[a, b, c]);
        // 最初の出現は無印、以降は _1, _2
        assert_eq!(joined.columns(), &["id", "id_1", "id_2"]);
    }

    #[test]
    fn test_cross_join_collision_with_existing_suffix() {
        // 既に "id_1" という列が存在する場合は "_2" へ進む
        let a = Relation::from_rows(
            vec!["id".to_string(), "id_1".to_string()],
            vec![vec![CellScalar::Number(1.0), CellScalar::Number(2.0)]],
        )
        .unwrap();
        let b = relation_of_numbers("id", &[3.0]);

        let joined = cross_join_all(&[a, b]);
        assert_eq!(joined.columns(), &["id", "id_1", "id_2"]);
    }

    #[test]
    fn test_cross_join_with_empty_relation() {
        // データ行のないリレーションとの結合は0行
        let a = relation_of_numbers("a", &[1.0, 2.0]);
        let b = relation_of_numbers("b", &[]);

        let joined = cross_join_all(&[a, b]);
        assert_eq!(joined.height(), 0);
        assert_eq!(joined.width(), 2);
    }

    #[test]
    fn test_cross_join_determinism() {
        let a = relation_of_numbers("a", &[1.0, 2.0, 3.0]);
        let b = relation_of_numbers("b", &[10.0, 20.0]);

        let first = cross_join_all(&[a.clone(), b.clone()]);
        let second = cross_join_all(&[a, b]);
        assert_eq!(first, second);
    }
}
