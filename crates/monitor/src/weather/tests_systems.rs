#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::prelude::*;

    use crate::error::FetchError;
    use crate::geometry::GeoPoint;
    use crate::weather::*;

    struct FixedWeather {
        fail_current: bool,
        fail_forecast: bool,
    }

    impl WeatherSource for FixedWeather {
        fn current(&self, _at: GeoPoint) -> Result<WeatherReading, FetchError> {
            if self.fail_current {
                return Err(FetchError::Status(401));
            }
            Ok(WeatherReading {
                temperature_c: 18.0,
                wind_kmh: 36.0,
            })
        }

        fn forecast(&self, _at: GeoPoint) -> Result<Vec<ForecastEntry>, FetchError> {
            if self.fail_forecast {
                return Err(FetchError::Transport("timeout".into()));
            }
            Ok(vec![ForecastEntry {
                timestamp: 1,
                temperature_c: 16.0,
                wind_kmh: 20.0,
            }])
        }
    }

    fn weather_app(source: FixedWeather) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(WeatherFeed::new(source));
        app.add_plugins(WeatherPlugin);
        app.update();
        app
    }

    fn settle(app: &mut App) {
        for _ in 0..500 {
            app.update();
            if !app.world().resource::<PendingWeather>().is_pending() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("weather lookup did not finish");
    }

    fn request(app: &mut App) {
        app.world_mut().send_event(WeatherRequest {
            label: "LT26".into(),
            at: GeoPoint::new(-33.03, -71.45),
        });
    }

    #[test]
    fn test_lookup_fills_popup() {
        let mut app = weather_app(FixedWeather {
            fail_current: false,
            fail_forecast: false,
        });
        request(&mut app);
        settle(&mut app);

        let popup = app.world().resource::<WeatherPopup>();
        let content = popup.content.as_ref().unwrap();
        assert_eq!(content.label, "LT26");
        let PopupState::Ready(report) = &content.state else {
            panic!("expected ready popup, got {:?}", content.state);
        };
        assert_eq!(report.current.temperature_c, 18.0);
        assert_eq!(report.forecast.len(), 1);
    }

    #[test]
    fn test_failed_lookup_shows_unavailable() {
        let mut app = weather_app(FixedWeather {
            fail_current: true,
            fail_forecast: false,
        });
        request(&mut app);
        settle(&mut app);

        let popup = app.world().resource::<WeatherPopup>();
        assert!(matches!(
            popup.content.as_ref().map(|c| &c.state),
            Some(PopupState::Unavailable(_))
        ));
    }

    #[test]
    fn test_forecast_failure_keeps_current() {
        let mut app = weather_app(FixedWeather {
            fail_current: false,
            fail_forecast: true,
        });
        request(&mut app);
        settle(&mut app);

        let popup = app.world().resource::<WeatherPopup>();
        let Some(PopupState::Ready(report)) = popup.content.as_ref().map(|c| &c.state) else {
            panic!("expected ready popup");
        };
        assert!(report.forecast.is_empty());
        assert_eq!(report.current.wind_kmh, 36.0);
    }

    #[test]
    fn test_layer_selection_uses_last_event() {
        let mut app = weather_app(FixedWeather {
            fail_current: false,
            fail_forecast: false,
        });
        app.world_mut()
            .send_event(SelectWeatherLayer(WeatherLayer::Temperature));
        app.world_mut().send_event(SelectWeatherLayer(WeatherLayer::Wind));
        app.update();
        assert_eq!(
            app.world().resource::<WeatherLayerSelection>().layer,
            WeatherLayer::Wind
        );

        app.world_mut()
            .send_event(SelectWeatherLayer(WeatherLayer::Normal));
        app.update();
        assert_eq!(
            app.world().resource::<WeatherLayerSelection>().layer,
            WeatherLayer::Normal
        );
    }
}
