//! 配置校验模块
//!
//! 校验规则：
//! - dispatcher name 非空且唯一
//! - 同一 dispatcher 内 listener name 非空且唯一
//! - priority 不能为 NaN
//! - fire 引用的 dispatcher 必须存在
//! - repeat >= 1

use std::collections::HashSet;

use contracts::{ContractError, ScenarioBlueprint};

/// 校验 ScenarioBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    validate_dispatcher_names(blueprint)?;
    validate_listeners(blueprint)?;
    validate_fires(blueprint)?;
    Ok(())
}

/// 校验 dispatcher name 唯一性
fn validate_dispatcher_names(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    if blueprint.dispatchers.is_empty() {
        return Err(ContractError::config_validation(
            "dispatchers",
            "at least one dispatcher is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, dispatcher) in blueprint.dispatchers.iter().enumerate() {
        if dispatcher.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("dispatchers[{}].name", idx),
                "dispatcher name cannot be empty",
            ));
        }
        if !seen.insert(dispatcher.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("dispatchers[name={}]", dispatcher.name),
                "duplicate dispatcher name",
            ));
        }
    }
    Ok(())
}

/// 校验 listener 名称与优先级
fn validate_listeners(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    for dispatcher in &blueprint.dispatchers {
        let mut seen = HashSet::new();
        for (idx, listener) in dispatcher.listeners.iter().enumerate() {
            if listener.name.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("dispatchers[{}].listeners[{}].name", dispatcher.name, idx),
                    "listener name cannot be empty",
                ));
            }
            if !seen.insert(listener.name.as_str()) {
                return Err(ContractError::config_validation(
                    format!(
                        "dispatchers[{}].listeners[name={}]",
                        dispatcher.name, listener.name
                    ),
                    "duplicate listener name",
                ));
            }
            if !listener.priority.is_valid() {
                return Err(ContractError::config_validation(
                    format!(
                        "dispatchers[{}].listeners[{}].priority",
                        dispatcher.name, listener.name
                    ),
                    "priority must not be NaN",
                ));
            }
        }
    }
    Ok(())
}

/// 校验 fire 列表
fn validate_fires(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    for (idx, fire) in blueprint.fires.iter().enumerate() {
        if blueprint.dispatcher(&fire.dispatcher).is_none() {
            return Err(ContractError::config_validation(
                format!("fires[{}].dispatcher", idx),
                format!("dispatcher '{}' is not declared", fire.dispatcher),
            ));
        }
        if fire.repeat == 0 {
            return Err(ContractError::config_validation(
                format!("fires[{}].repeat", idx),
                "repeat must be >= 1",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{DispatcherSpec, FireSpec, ListenerAction, ListenerSpec, Priority};

    fn listener(name: &str, priority: f64) -> ListenerSpec {
        ListenerSpec {
            name: name.to_string(),
            priority: Priority::from(priority),
            once: false,
            delay_ms: 0,
            action: ListenerAction::Log,
        }
    }

    fn blueprint(listeners: Vec<ListenerSpec>, fires: Vec<FireSpec>) -> ScenarioBlueprint {
        ScenarioBlueprint {
            version: Default::default(),
            dispatchers: vec![DispatcherSpec {
                name: "input".to_string(),
                cancellable: true,
                listeners,
            }],
            fires,
        }
    }

    fn fire(dispatcher: &str, repeat: u32) -> FireSpec {
        FireSpec {
            dispatcher: dispatcher.to_string(),
            payload: String::new(),
            cancel_after_ms: None,
            repeat,
        }
    }

    #[test]
    fn test_valid_blueprint() {
        let bp = blueprint(
            vec![listener("a", 1.0), listener("b", f64::INFINITY)],
            vec![fire("input", 1)],
        );
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_no_dispatchers() {
        let mut bp = blueprint(vec![], vec![]);
        bp.dispatchers.clear();
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_duplicate_dispatcher() {
        let mut bp = blueprint(vec![], vec![]);
        bp.dispatchers.push(bp.dispatchers[0].clone());
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate dispatcher name"));
    }

    #[test]
    fn test_duplicate_listener() {
        let bp = blueprint(vec![listener("a", 0.0), listener("a", 1.0)], vec![]);
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate listener name"));
    }

    #[test]
    fn test_empty_listener_name() {
        let bp = blueprint(vec![listener("  ", 0.0)], vec![]);
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_nan_priority() {
        let bp = blueprint(vec![listener("a", f64::NAN)], vec![]);
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_unknown_fire_target() {
        let bp = blueprint(vec![], vec![fire("nope", 1)]);
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn test_zero_repeat() {
        let bp = blueprint(vec![], vec![fire("input", 0)]);
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("repeat"));
    }
}
