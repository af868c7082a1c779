// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::{load_and_validate_config, CarMode};
    use crate::stages::routing::routing_lines;
    use crate::stages::PipelineStage;

    /// The sorting variant loads, validates and selects every sorting stage
    #[test]
    fn test_multi_gate_sort_yaml_loading() {
        let config = load_and_validate_config("configs/multi-gate-sort.yaml").unwrap();

        assert_eq!(config.stages.len(), 7);
        assert!(config.is_selected(PipelineStage::KilosortHelper));
        assert_eq!(config.catgt.car_mode, CarMode::Gbldmx);
        assert_eq!(config.catgt.ni_extract.len(), 21);
        assert_eq!(config.regions["cortex"].ks_threshold, Some([9, 4]));
        assert_eq!(config.run_specs.len(), 2);
        assert_eq!(config.run_specs[1].regions, vec!["cortex", "medulla"]);
    }

    /// The no-sort variant shares the model but not the numeric defaults
    #[test]
    fn test_single_probe_no_sort_yaml_loading() {
        let config = load_and_validate_config("configs/single-probe-no-sort.yaml").unwrap();

        assert_eq!(
            config.selected_stages(),
            vec![PipelineStage::CatGt, PipelineStage::TPrime]
        );
        assert_eq!(config.catgt.car_mode, CarMode::None);
        assert_eq!(config.catgt.sync_extract_params, "384,6,500");
        assert_eq!(config.tprime.to_stream_sync_params, "SY=0,384,6,500");

        let lines = routing_lines(&config.catgt, &["0"]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("-XA=0,1,3,500 -XA=1,2.5,2.49,0 -XD=2,0,10"));
        assert!(lines[0].ends_with("-SY=0,384,6,500"));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_and_validate_config("configs/does-not-exist.yaml").unwrap_err();
        assert!(err.to_string().contains("does-not-exist.yaml"));
    }
}
