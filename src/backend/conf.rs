//! # phonopy 配置文件生成工具
//!
//! 生成每个采样点的 phonopy.conf；用户给定模板时只做
//! PRESSURE 标签的插入或替换。
//!
//! ## 依赖关系
//! - 被 `backend/driver.rs` 使用
//! - 无外部模块依赖

use crate::models::PhononSettings;

/// 生成 phonopy.conf 文本
pub fn generate_phonopy_conf(settings: &PhononSettings, stress_gpa: f64, use_nac: bool) -> String {
    let mut conf = format!(
        r#"DIM = {} {} {}
MP = {} {} {}
DISPLACEMENT_DISTANCE = {}
TPROP = .TRUE.
TMIN = 0
TMAX = {}
TSTEP = {}
PRESSURE = {}
"#,
        settings.supercell[0],
        settings.supercell[1],
        settings.supercell[2],
        settings.mesh[0],
        settings.mesh[1],
        settings.mesh[2],
        settings.displacement_distance,
        settings.t_max,
        settings.t_step,
        stress_gpa,
    );

    if use_nac {
        conf.push_str("NAC = .TRUE.\n");
    }

    conf
}

/// 在 .conf 模板中插入或替换 PRESSURE 标签
pub fn upsert_pressure_tag(conf_text: &str, stress_gpa: f64) -> String {
    use regex::Regex;

    let tag = format!("PRESSURE = {}", stress_gpa);

    let pattern = Regex::new(r"(?im)^[ \t]*PRESSURE[ \t]*=.*$").unwrap();
    if pattern.is_match(conf_text) {
        return pattern.replace_all(conf_text, tag.as_str()).to_string();
    }

    let stripped = conf_text.trim_end();
    format!("{}\n{}\n", stripped, tag)
}
