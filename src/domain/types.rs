// ==========================================
// 高校选课系统 - 领域类型定义
// ==========================================
// 红线: 成绩等级只能由分数推导,不接受调用方直接指定
// 红线: 只有 ENROLLED 状态的选课记录占用课程名额
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 成绩等级 (Grade)
// ==========================================
// 顺序: A+ > A > A- > ... > D > F (声明顺序即由高到低)
// 绩点: 固定参考数据,不可修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    APlus,
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    CMinus,
    DPlus,
    D,
    F,
}

/// 等级分段表（自上而下匹配,命中即返回）
///
/// (下限, 等级): score >= 下限 → 等级
const GRADE_THRESHOLDS: [(f64, Grade); 11] = [
    (85.0, Grade::APlus),
    (70.0, Grade::A),
    (65.0, Grade::AMinus),
    (60.0, Grade::BPlus),
    (55.0, Grade::B),
    (50.0, Grade::BMinus),
    (45.0, Grade::CPlus),
    (40.0, Grade::C),
    (35.0, Grade::CMinus),
    (30.0, Grade::DPlus),
    (25.0, Grade::D),
];

impl Grade {
    /// 分数 → 等级
    ///
    /// 分数范围校验由调用方负责;NaN 落入 F。
    pub fn from_score(score: f64) -> Self {
        GRADE_THRESHOLDS
            .iter()
            .find(|(lower, _)| score >= *lower)
            .map(|(_, grade)| *grade)
            .unwrap_or(Grade::F)
    }

    /// 全部等级（由高到低）
    pub const ALL: [Grade; 12] = [
        Grade::APlus,
        Grade::A,
        Grade::AMinus,
        Grade::BPlus,
        Grade::B,
        Grade::BMinus,
        Grade::CPlus,
        Grade::C,
        Grade::CMinus,
        Grade::DPlus,
        Grade::D,
        Grade::F,
    ];

    /// 展示标签（A+ / A / A- ...）
    pub fn label(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// 绩点
    pub fn gpa_value(&self) -> f64 {
        match self {
            Grade::APlus => 4.0,
            Grade::A => 4.0,
            Grade::AMinus => 3.7,
            Grade::BPlus => 3.3,
            Grade::B => 3.0,
            Grade::BMinus => 2.7,
            Grade::CPlus => 2.3,
            Grade::C => 2.0,
            Grade::CMinus => 1.7,
            Grade::DPlus => 1.3,
            Grade::D => 1.0,
            Grade::F => 0.0,
        }
    }

    /// 从数据库字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A_PLUS" => Some(Grade::APlus),
            "A" => Some(Grade::A),
            "A_MINUS" => Some(Grade::AMinus),
            "B_PLUS" => Some(Grade::BPlus),
            "B" => Some(Grade::B),
            "B_MINUS" => Some(Grade::BMinus),
            "C_PLUS" => Some(Grade::CPlus),
            "C" => Some(Grade::C),
            "C_MINUS" => Some(Grade::CMinus),
            "D_PLUS" => Some(Grade::DPlus),
            "D" => Some(Grade::D),
            "F" => Some(Grade::F),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A_PLUS",
            Grade::A => "A",
            Grade::AMinus => "A_MINUS",
            Grade::BPlus => "B_PLUS",
            Grade::B => "B",
            Grade::BMinus => "B_MINUS",
            Grade::CPlus => "C_PLUS",
            Grade::C => "C",
            Grade::CMinus => "C_MINUS",
            Grade::DPlus => "D_PLUS",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 选课状态 (Registration Status)
// ==========================================
// 状态机:
//   ENROLLED  -> DROPPED | COMPLETED
//   DROPPED   -> ENROLLED (重新准入,需重新校验容量)
//   COMPLETED -> (终态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Enrolled,  // 在读(占用名额)
    Dropped,   // 已退课
    Completed, // 已结课
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl RegistrationStatus {
    /// 从数据库字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ENROLLED" => Some(RegistrationStatus::Enrolled),
            "DROPPED" => Some(RegistrationStatus::Dropped),
            "COMPLETED" => Some(RegistrationStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Enrolled => "ENROLLED",
            RegistrationStatus::Dropped => "DROPPED",
            RegistrationStatus::Completed => "COMPLETED",
        }
    }

    /// 是否占用课程名额
    pub fn holds_seat(&self) -> bool {
        matches!(self, RegistrationStatus::Enrolled)
    }

    /// 是否为有效(非退课)记录
    ///
    /// 同一 (学生, 课程) 至多存在一条有效记录
    pub fn is_active(&self) -> bool {
        !matches!(self, RegistrationStatus::Dropped)
    }

    /// 状态转换是否合法
    ///
    /// 同状态转换视为合法（仅更新附带字段,例如最终成绩）,COMPLETED 除外。
    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        match (self, next) {
            (Enrolled, Enrolled) | (Dropped, Dropped) => true,
            (Enrolled, Dropped) | (Enrolled, Completed) => true,
            (Dropped, Enrolled) => true,
            (Dropped, Completed) => false,
            (Completed, _) => false,
        }
    }
}

// ==========================================
// 考核类型 (Exam Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamType {
    Midterm,
    Final,
    Quiz,
    Assignment,
    Project,
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ExamType {
    /// 从数据库字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MIDTERM" => Some(ExamType::Midterm),
            "FINAL" => Some(ExamType::Final),
            "QUIZ" => Some(ExamType::Quiz),
            "ASSIGNMENT" => Some(ExamType::Assignment),
            "PROJECT" => Some(ExamType::Project),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExamType::Midterm => "MIDTERM",
            ExamType::Final => "FINAL",
            ExamType::Quiz => "QUIZ",
            ExamType::Assignment => "ASSIGNMENT",
            ExamType::Project => "PROJECT",
        }
    }
}

// ==========================================
// 删除策略 (Delete Policy)
// ==========================================
// 用途: 删除被选课/成绩引用的课程或学生时的处理方式
// 配置项: catalog.delete_policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeletePolicy {
    #[default]
    Block,   // 存在引用时拒绝删除
    Cascade, // 同一事务内级联删除选课记录与成绩
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DeletePolicy {
    /// 从配置字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BLOCK" => Some(DeletePolicy::Block),
            "CASCADE" => Some(DeletePolicy::Cascade),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DeletePolicy::Block => "BLOCK",
            DeletePolicy::Cascade => "CASCADE",
        }
    }
}
