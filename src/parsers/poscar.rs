//! # VASP POSCAR 格式解析器
//!
//! 解析与生成 VASP 5+ 的 POSCAR/CONTCAR 文件；驱动后端用它
//! 写入初始结构并读回弛豫后的 CONTCAR。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `backend/driver.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QhaError, Result};
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 8 {
        return Err(parse_error(default_name, "File too short"));
    }

    // Line 0: 注释/结构名
    let name = lines[0].trim();
    let name = if name.is_empty() { default_name } else { name };

    // Line 1: 全局缩放因子
    let scale: f64 = lines[1].trim().parse().unwrap_or(1.0);

    // Lines 2-4: 晶格向量
    let mut matrix = [[0.0; 3]; 3];
    for i in 0..3 {
        let row = parse_floats(lines[2 + i]);
        if row.len() < 3 {
            return Err(parse_error(
                name,
                &format!("Invalid lattice vector at line {}", 3 + i),
            ));
        }
        matrix[i] = [row[0] * scale, row[1] * scale, row[2] * scale];
    }
    let lattice = Lattice::from_vectors(matrix);

    // Line 5/6: 元素符号与各元素原子数
    let elements: Vec<String> = lines[5].split_whitespace().map(|s| s.to_string()).collect();
    if elements.is_empty() || elements[0].parse::<i32>().is_ok() {
        return Err(parse_error(
            name,
            "Missing element symbol line (VASP 5+ format required)",
        ));
    }
    let counts: Vec<usize> = lines[6]
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();
    if counts.len() != elements.len() {
        return Err(parse_error(name, "Element and count lines do not match"));
    }

    // 可选的 Selective dynamics 行
    let mut coord_line = 7;
    if lines[coord_line]
        .trim()
        .to_lowercase()
        .starts_with("selective")
    {
        coord_line += 1;
    }
    if lines.len() <= coord_line {
        return Err(parse_error(name, "Missing coordinate type line"));
    }

    let coord_type = lines[coord_line].trim().to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');

    // 原子坐标
    let mut atoms: Vec<Atom> = Vec::new();
    let mut line_idx = coord_line + 1;
    for (element, &count) in elements.iter().zip(counts.iter()) {
        for _ in 0..count {
            let row = lines
                .get(line_idx)
                .map(|l| parse_floats(l))
                .unwrap_or_default();
            if row.len() < 3 {
                return Err(parse_error(
                    name,
                    &format!("Missing atom position at line {}", line_idx + 1),
                ));
            }
            let position = if is_cartesian {
                lattice.to_fractional([row[0], row[1], row[2]])
            } else {
                [row[0], row[1], row[2]]
            };
            atoms.push(Atom::new(element.clone(), position));
            line_idx += 1;
        }
    }

    Ok(Crystal::new(name, lattice, atoms))
}

/// 将 Crystal 转换为 POSCAR 格式字符串（Direct 坐标）
pub fn to_poscar_string(crystal: &Crystal) -> String {
    // 按首次出现顺序给元素分组
    let mut groups: Vec<(String, Vec<[f64; 3]>)> = Vec::new();
    for atom in &crystal.atoms {
        match groups.iter_mut().find(|(el, _)| *el == atom.element) {
            Some((_, positions)) => positions.push(atom.position),
            None => groups.push((atom.element.clone(), vec![atom.position])),
        }
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", crystal.name));
    out.push_str("1.0\n");

    for row in &crystal.lattice.matrix {
        out.push_str(&format!(
            "  {:18.12}  {:18.12}  {:18.12}\n",
            row[0], row[1], row[2]
        ));
    }

    let symbols: Vec<&str> = groups.iter().map(|(el, _)| el.as_str()).collect();
    let counts: Vec<String> = groups.iter().map(|(_, p)| p.len().to_string()).collect();
    out.push_str(&format!("  {}\n", symbols.join("  ")));
    out.push_str(&format!("  {}\n", counts.join("  ")));
    out.push_str("Direct\n");

    for (_, positions) in &groups {
        for pos in positions {
            out.push_str(&format!(
                "  {:18.12}  {:18.12}  {:18.12}\n",
                pos[0], pos[1], pos[2]
            ));
        }
    }

    out
}

/// 提取一行中的全部浮点数（前三个有效）
fn parse_floats(line: &str) -> Vec<f64> {
    line.split_whitespace()
        .take(3)
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn parse_error(name: &str, reason: &str) -> QhaError {
    QhaError::ParseError {
        format: "poscar".to_string(),
        path: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poscar_direct() {
        let content = r#"NaCl
1.0
5.64 0.0 0.0
0.0 5.64 0.0
0.0 0.0 5.64
Na Cl
4 4
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
0.0 0.5 0.5
0.5 0.0 0.0
0.0 0.5 0.0
0.0 0.0 0.5
0.5 0.5 0.5
"#;
        let crystal = parse_poscar_content(content, "NaCl").unwrap();
        assert_eq!(crystal.name, "NaCl");
        assert_eq!(crystal.atoms.len(), 8);

        let na_count = crystal.atoms.iter().filter(|a| a.element == "Na").count();
        let cl_count = crystal.atoms.iter().filter(|a| a.element == "Cl").count();
        assert_eq!(na_count, 4);
        assert_eq!(cl_count, 4);
    }

    #[test]
    fn test_parse_poscar_with_scale_and_cartesian() {
        let content = r#"Si
2.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Si
2
Cartesian
0.0 0.0 0.0
2.0 2.0 2.0
"#;
        let crystal = parse_poscar_content(content, "Si").unwrap();
        let (a, _, _, _, _, _) = crystal.lattice.parameters();

        // 2.0 * 2.0 = 4.0
        assert!((a - 4.0).abs() < 0.01);

        // 笛卡尔 (2, 2, 2) 在 4 Å 立方晶胞中的分数坐标是 (0.5, 0.5, 0.5)
        let frac = crystal.atoms[1].position;
        assert!((frac[0] - 0.5).abs() < 1e-10);
        assert!((frac[1] - 0.5).abs() < 1e-10);
        assert!((frac[2] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_parse_poscar_selective_dynamics() {
        let content = r#"Fe
1.0
2.87 0.0 0.0
0.0 2.87 0.0
0.0 0.0 2.87
Fe
2
Selective dynamics
Direct
0.0 0.0 0.0 T T T
0.5 0.5 0.5 F F F
"#;
        let crystal = parse_poscar_content(content, "Fe").unwrap();
        assert_eq!(crystal.atoms.len(), 2);
    }

    #[test]
    fn test_poscar_round_trip() {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);
        let atoms = vec![
            Atom::new("Ti", [0.0, 0.0, 0.0]),
            Atom::new("O", [0.5, 0.5, 0.0]),
            Atom::new("O", [0.5, 0.0, 0.5]),
        ];
        let crystal = Crystal::new("TiO2", lattice, atoms);

        let text = to_poscar_string(&crystal);
        let parsed = parse_poscar_content(&text, "round_trip").unwrap();

        assert_eq!(parsed.atoms.len(), 3);
        assert!((parsed.volume() - 64.0).abs() < 1e-6);

        let ti_count = parsed.atoms.iter().filter(|a| a.element == "Ti").count();
        let o_count = parsed.atoms.iter().filter(|a| a.element == "O").count();
        assert_eq!(ti_count, 1);
        assert_eq!(o_count, 2);
    }

    #[test]
    fn test_vasp4_format_rejected() {
        let content = r#"old format
1.0
4.0 0.0 0.0
0.0 4.0 0.0
0.0 0.0 4.0
2
Direct
0.0 0.0 0.0
0.5 0.5 0.5
"#;
        assert!(parse_poscar_content(content, "old").is_err());
    }
}
