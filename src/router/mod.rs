//! 路由模块：程序表、命令启动与路由门面
pub mod program;
pub mod launcher;
pub mod uroute;

pub use self::program::{Program, ProgramTable};
pub use self::launcher::{build_args, launch, LaunchPlan, URL_PLACEHOLDER};
pub use self::uroute::Uroute;
