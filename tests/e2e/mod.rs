mod mock_agent;
