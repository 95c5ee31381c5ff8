//! # aerial-autonomy
//!
//! 无人机飞行控制中间件：把数值控制器绑定到硬件端点、在分组锁
//! 下调度激活控制器、用带守卫的飞行模式状态机驱动整个系统。
//!
//! # 架构设计
//!
//! 本 crate 采用分层架构，从底层到高层：
//!
//! - **硬件层** (`hardware` / `sim`): 硬件接缝与仿真后端
//! - **控制层** (`controllers`): 纯控制律，无 IO
//! - **连接层** (`connectors`): 控制器-硬件连接器，统一的 `run()` 协议
//! - **调度层** (`registry`): 每分组至多一个激活 connector 的注册表
//! - **系统层** (`system`): [`UavSystem`](system::UavSystem) 门面
//! - **模式层** (`state_machine`): 飞行模式状态机（守卫 + 迁移表）
//! - **驱动层** (`loop_runner`): 定频控制循环
//!
//! # 快速上手
//!
//! ```
//! use aerial_autonomy::config::UavSystemConfig;
//! use aerial_autonomy::sim::QuadSimulator;
//! use aerial_autonomy::state_machine::{FlightEvent, FlightStateMachine};
//! use aerial_autonomy::system::UavSystem;
//! use aerial_autonomy::types::PositionYaw;
//! use std::sync::Arc;
//!
//! let sim = Arc::new(QuadSimulator::new(0.5));
//! let system = Arc::new(UavSystem::new(sim, UavSystemConfig::default())?);
//! let mut machine = FlightStateMachine::new(system);
//!
//! machine.process_event(FlightEvent::Takeoff);
//! machine.tick();
//! machine.process_event(FlightEvent::PositionGoal(PositionYaw::new(1.0, 1.0, 1.0, 0.0)));
//! # Ok::<(), aerial_autonomy::error::UavError>(())
//! ```

pub mod config;
pub mod connectors;
pub mod controllers;
pub mod error;
pub mod estimation;
pub mod hardware;
pub mod loop_runner;
pub mod recording;
pub mod registry;
pub mod sensors;
pub mod sim;
pub mod state_machine;
pub mod system;
pub mod types;

pub use config::UavSystemConfig;
pub use error::{ConfigError, UavError};
pub use state_machine::{FlightEvent, FlightState, FlightStateMachine};
pub use system::{UavSystem, UavSystemBuilder};
pub use types::{ControllerStatus, HardwareGroup};
